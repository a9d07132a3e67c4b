use crate::db::{self, Database};
use crate::error::AppError;
use crate::models::Cliente;
use crate::utils;

pub fn crear_cliente(db: &Database, cliente: Cliente) -> Result<i64, AppError> {
    if cliente.nombre.trim().is_empty() {
        return Err(AppError::validacion("El nombre del cliente es obligatorio"));
    }

    let conn = db.conexion()?;

    conn.execute(
        "INSERT INTO clientes (nombre, contacto, telefono, email, observaciones,
         max_dias_devolucion, activo)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            cliente.nombre.trim(),
            cliente.contacto,
            cliente.telefono,
            cliente.email,
            cliente.observaciones,
            cliente.max_dias_devolucion,
            cliente.activo as i32,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn actualizar_cliente(db: &Database, cliente: Cliente) -> Result<(), AppError> {
    let conn = db.conexion()?;
    let id = cliente
        .id
        .ok_or_else(|| AppError::validacion("ID requerido para actualizar"))?;

    let afectadas = conn.execute(
        "UPDATE clientes SET nombre=?1, contacto=?2, telefono=?3, email=?4,
         observaciones=?5, max_dias_devolucion=?6, activo=?7,
         updated_at=datetime('now','localtime')
         WHERE id=?8",
        rusqlite::params![
            cliente.nombre.trim(),
            cliente.contacto,
            cliente.telefono,
            cliente.email,
            cliente.observaciones,
            cliente.max_dias_devolucion,
            cliente.activo as i32,
            id,
        ],
    )?;

    if afectadas == 0 {
        return Err(AppError::no_encontrado(format!("Cliente {} no existe", id)));
    }

    Ok(())
}

fn mapear_cliente(row: &rusqlite::Row) -> rusqlite::Result<Cliente> {
    Ok(Cliente {
        id: Some(row.get(0)?),
        nombre: row.get(1)?,
        contacto: row.get(2)?,
        telefono: row.get(3)?,
        email: row.get(4)?,
        observaciones: row.get(5)?,
        max_dias_devolucion: row.get(6)?,
        activo: row.get::<_, i64>(7)? != 0,
    })
}

const COLUMNAS_CLIENTE: &str =
    "id, nombre, contacto, telefono, email, observaciones, max_dias_devolucion, activo";

pub fn obtener_cliente(db: &Database, id: i64) -> Result<Cliente, AppError> {
    let conn = db.conexion()?;
    let sql = format!("SELECT {} FROM clientes WHERE id = ?1", COLUMNAS_CLIENTE);
    conn.query_row(&sql, rusqlite::params![id], mapear_cliente)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::no_encontrado(format!("Cliente {} no existe", id))
            }
            otro => otro.into(),
        })
}

pub fn buscar_clientes(db: &Database, termino: &str) -> Result<Vec<Cliente>, AppError> {
    let conn = db.conexion()?;
    let busqueda = format!("%{}%", termino);

    let sql = format!(
        "SELECT {} FROM clientes
         WHERE activo = 1 AND (nombre LIKE ?1 OR contacto LIKE ?1)
         ORDER BY nombre LIMIT 30",
        COLUMNAS_CLIENTE
    );
    let mut stmt = conn.prepare(&sql)?;
    let clientes = stmt
        .query_map(rusqlite::params![busqueda], mapear_cliente)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(clientes)
}

pub fn listar_clientes(db: &Database) -> Result<Vec<Cliente>, AppError> {
    let conn = db.conexion()?;

    let sql = format!(
        "SELECT {} FROM clientes WHERE activo = 1 ORDER BY nombre",
        COLUMNAS_CLIENTE
    );
    let mut stmt = conn.prepare(&sql)?;
    let clientes = stmt
        .query_map([], mapear_cliente)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(clientes)
}

/// Desactiva clientes sin pedidos recientes. El umbral de días viene de la
/// configuración salvo que se indique uno. Retorna cuántos se desactivaron.
pub fn desactivar_clientes_inactivos(db: &Database, dias: Option<i64>) -> Result<usize, AppError> {
    let conn = db.conexion()?;
    let dias = dias.unwrap_or_else(|| db::config_entero(&conn, "dias_cliente_inactivo", 30));
    let limite = utils::fecha_mas_dias(-dias);

    let afectados = conn.execute(
        "UPDATE clientes SET activo = 0, updated_at = datetime('now','localtime')
         WHERE activo = 1
           AND created_at < ?1
           AND id NOT IN (SELECT cliente_id FROM pedidos WHERE fecha >= ?1)",
        rusqlite::params![limite],
    )?;

    if afectados > 0 {
        tracing::info!(afectados, dias, "clientes inactivos desactivados");
    }

    Ok(afectados)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn cliente_de_prueba(nombre: &str) -> Cliente {
        Cliente {
            id: None,
            nombre: nombre.to_string(),
            contacto: Some("Laura M.".to_string()),
            telefono: None,
            email: None,
            observaciones: None,
            max_dias_devolucion: 30,
            activo: true,
        }
    }

    #[test]
    fn test_crear_y_obtener_cliente() {
        let db = Database::abrir_en_memoria().unwrap();
        let id = crear_cliente(&db, cliente_de_prueba("DISTRIBUIDORA NORTE")).unwrap();

        let cliente = obtener_cliente(&db, id).unwrap();
        assert_eq!(cliente.nombre, "DISTRIBUIDORA NORTE");
        assert_eq!(cliente.max_dias_devolucion, 30);
        assert!(cliente.activo);
    }

    #[test]
    fn test_nombre_vacio_rechazado() {
        let db = Database::abrir_en_memoria().unwrap();
        let err = crear_cliente(&db, cliente_de_prueba("   "));
        assert!(matches!(err, Err(AppError::Validacion(_))));
    }

    #[test]
    fn test_buscar_solo_activos() {
        let db = Database::abrir_en_memoria().unwrap();
        crear_cliente(&db, cliente_de_prueba("ZAPATERIA SUR")).unwrap();
        let id = crear_cliente(&db, cliente_de_prueba("ZAPATERIA CENTRO")).unwrap();

        let mut baja = obtener_cliente(&db, id).unwrap();
        baja.activo = false;
        actualizar_cliente(&db, baja).unwrap();

        let encontrados = buscar_clientes(&db, "ZAPATERIA").unwrap();
        assert_eq!(encontrados.len(), 1);
        assert_eq!(encontrados[0].nombre, "ZAPATERIA SUR");
    }

    #[test]
    fn test_actualizar_inexistente() {
        let db = Database::abrir_en_memoria().unwrap();
        let mut cliente = cliente_de_prueba("X");
        cliente.id = Some(999);
        assert!(matches!(
            actualizar_cliente(&db, cliente),
            Err(AppError::NoEncontrado(_))
        ));
    }

    #[test]
    fn test_desactivar_clientes_inactivos() {
        let db = Database::abrir_en_memoria().unwrap();
        let viejo = crear_cliente(&db, cliente_de_prueba("SIN MOVIMIENTO")).unwrap();
        let nuevo = crear_cliente(&db, cliente_de_prueba("RECIENTE")).unwrap();
        {
            let conn = db.conexion().unwrap();
            // Cliente dado de alta hace 90 días y sin pedidos
            conn.execute(
                "UPDATE clientes SET created_at = ?1 WHERE id = ?2",
                rusqlite::params![utils::fecha_mas_dias(-90), viejo],
            )
            .unwrap();
        }

        let afectados = desactivar_clientes_inactivos(&db, Some(30)).unwrap();
        assert_eq!(afectados, 1);
        assert!(!obtener_cliente(&db, viejo).unwrap().activo);
        assert!(obtener_cliente(&db, nuevo).unwrap().activo);
    }
}
