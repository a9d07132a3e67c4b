use crate::commands::usuarios;
use crate::creditos;
use crate::db::{Database, SesionState};
use crate::error::AppError;
use crate::models::{Devolucion, DEVOLUCION_CAMBIO, DEVOLUCION_DEFECTO, NOTA_CREDITO};
use crate::utils;
use rusqlite::TransactionBehavior;
use rust_decimal::Decimal;

fn mapear_devolucion(row: &rusqlite::Row) -> rusqlite::Result<Devolucion> {
    Ok(Devolucion {
        id: Some(row.get(0)?),
        cliente_id: row.get(1)?,
        producto_id: row.get(2)?,
        tipo: row.get(3)?,
        motivo: row.get(4)?,
        estado: row.get(5)?,
        confirmacion_proveedor: row.get::<_, i64>(6)? != 0,
        afecta_inventario: row.get::<_, i64>(7)? != 0,
        saldo_a_favor_generado: utils::leer_decimal(row, 8)?,
        nota_credito_id: row.get(9)?,
        fecha: row.get(10)?,
        usuario: row.get(11)?,
    })
}

const COLUMNAS_DEVOLUCION: &str = "id, cliente_id, producto_id, tipo, motivo, estado,
     confirmacion_proveedor, afecta_inventario, saldo_a_favor_generado, nota_credito_id, fecha, usuario";

/// Alta de una devolución. Queda PENDIENTE hasta que el personal la valide.
pub fn registrar_devolucion(
    db: &Database,
    sesion: &SesionState,
    cliente_id: i64,
    producto_id: i64,
    tipo: &str,
    motivo: Option<String>,
) -> Result<Devolucion, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    if tipo != DEVOLUCION_DEFECTO && tipo != DEVOLUCION_CAMBIO {
        return Err(AppError::validacion(format!(
            "Tipo de devolución no válido: {}",
            tipo
        )));
    }

    let conn = db.conexion()?;

    let admite: bool = conn
        .query_row(
            "SELECT admite_devolucion FROM productos WHERE id = ?1 AND activo = 1",
            rusqlite::params![producto_id],
            |row| Ok(row.get::<_, i64>(0)? != 0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::no_encontrado(format!("Producto {} no existe", producto_id))
            }
            otro => otro.into(),
        })?;
    if !admite {
        return Err(AppError::validacion("El producto no admite devolución"));
    }

    let cliente_existe: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM clientes WHERE id = ?1",
            rusqlite::params![cliente_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|c| c > 0)
        .unwrap_or(false);
    if !cliente_existe {
        return Err(AppError::no_encontrado(format!(
            "Cliente {} no existe",
            cliente_id
        )));
    }

    conn.execute(
        "INSERT INTO devoluciones (cliente_id, producto_id, tipo, motivo, usuario)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![cliente_id, producto_id, tipo, motivo, actual.nombre],
    )?;

    Ok(Devolucion {
        id: Some(conn.last_insert_rowid()),
        cliente_id,
        producto_id,
        tipo: tipo.to_string(),
        motivo,
        estado: "PENDIENTE".to_string(),
        confirmacion_proveedor: false,
        afecta_inventario: true,
        saldo_a_favor_generado: Decimal::ZERO,
        nota_credito_id: None,
        fecha: None,
        usuario: Some(actual.nombre),
    })
}

/// Resuelve una devolución pendiente. Al aprobarla regresa la pieza al
/// inventario y emite una nota de crédito por el precio del producto;
/// al rechazarla solo cambia el estado.
pub fn validar_devolucion(
    db: &Database,
    sesion: &SesionState,
    devolucion_id: i64,
    aprobar: bool,
) -> Result<Devolucion, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let sql = format!(
        "SELECT {} FROM devoluciones WHERE id = ?1",
        COLUMNAS_DEVOLUCION
    );
    let mut devolucion = tx
        .query_row(&sql, rusqlite::params![devolucion_id], mapear_devolucion)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::no_encontrado(format!("Devolución {} no existe", devolucion_id))
            }
            otro => otro.into(),
        })?;

    if devolucion.estado != "PENDIENTE" {
        return Err(AppError::validacion(format!(
            "La devolución {} ya fue resuelta ({})",
            devolucion_id, devolucion.estado
        )));
    }

    if !aprobar {
        tx.execute(
            "UPDATE devoluciones SET estado = 'RECHAZADA' WHERE id = ?1",
            rusqlite::params![devolucion_id],
        )?;
        tx.commit()?;
        devolucion.estado = "RECHAZADA".to_string();
        return Ok(devolucion);
    }

    let (codigo, precio): (String, Decimal) = tx.query_row(
        "SELECT codigo, precio FROM productos WHERE id = ?1",
        rusqlite::params![devolucion.producto_id],
        |row| Ok((row.get(0)?, utils::leer_decimal(row, 1)?)),
    )?;

    if devolucion.afecta_inventario {
        tx.execute(
            "UPDATE productos SET stock_actual = stock_actual + 1,
             updated_at = datetime('now','localtime')
             WHERE id = ?1",
            rusqlite::params![devolucion.producto_id],
        )?;
    }

    let nota = creditos::crear_nota_automatica(
        &tx,
        devolucion.cliente_id,
        precio,
        NOTA_CREDITO,
        None,
        &format!("Devolución {} de {}", devolucion_id, codigo),
        Some(&actual.nombre),
    )?;

    tx.execute(
        "UPDATE devoluciones SET estado = 'VALIDADA', saldo_a_favor_generado = ?1,
         nota_credito_id = ?2
         WHERE id = ?3",
        rusqlite::params![precio.to_string(), nota.id, devolucion_id],
    )?;

    tx.commit()?;

    tracing::info!(
        devolucion_id,
        nota = %nota.numero_nota,
        %precio,
        "devolución validada"
    );

    devolucion.estado = "VALIDADA".to_string();
    devolucion.saldo_a_favor_generado = precio;
    devolucion.nota_credito_id = nota.id;
    Ok(devolucion)
}

pub fn listar_devoluciones_pendientes(db: &Database) -> Result<Vec<Devolucion>, AppError> {
    let conn = db.conexion()?;

    let sql = format!(
        "SELECT {} FROM devoluciones WHERE estado = 'PENDIENTE' ORDER BY fecha",
        COLUMNAS_DEVOLUCION
    );
    let mut stmt = conn.prepare(&sql)?;
    let devoluciones = stmt
        .query_map([], mapear_devolucion)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(devoluciones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::creditos::consultar_credito_disponible;
    use crate::commands::ordenes::tests::entorno;
    use crate::commands::productos::{self, tests::producto_de_prueba};
    use rust_decimal_macros::dec;

    #[test]
    fn test_devolucion_aprobada_emite_nota_y_regresa_stock() {
        let (db, sesion, cliente) = entorno();
        let producto = productos::crear_producto(&db, producto_de_prueba("AN-1")).unwrap();

        let devolucion = registrar_devolucion(
            &db,
            &sesion,
            cliente,
            producto,
            DEVOLUCION_DEFECTO,
            Some("Costura abierta".to_string()),
        )
        .unwrap();
        assert_eq!(listar_devoluciones_pendientes(&db).unwrap().len(), 1);

        let resuelta = validar_devolucion(&db, &sesion, devolucion.id.unwrap(), true).unwrap();
        assert_eq!(resuelta.estado, "VALIDADA");
        assert_eq!(resuelta.saldo_a_favor_generado, dec!(550.00));
        assert!(resuelta.nota_credito_id.is_some());

        // La pieza regresó al inventario y el cliente tiene saldo a favor
        assert_eq!(productos::obtener_producto(&db, producto).unwrap().stock_actual, 11);
        assert_eq!(
            consultar_credito_disponible(&db, cliente).unwrap(),
            dec!(550.00)
        );
        assert!(listar_devoluciones_pendientes(&db).unwrap().is_empty());
    }

    #[test]
    fn test_devolucion_rechazada_no_toca_nada() {
        let (db, sesion, cliente) = entorno();
        let producto = productos::crear_producto(&db, producto_de_prueba("AN-1")).unwrap();
        let devolucion = registrar_devolucion(
            &db,
            &sesion,
            cliente,
            producto,
            DEVOLUCION_CAMBIO,
            None,
        )
        .unwrap();

        let resuelta = validar_devolucion(&db, &sesion, devolucion.id.unwrap(), false).unwrap();
        assert_eq!(resuelta.estado, "RECHAZADA");

        assert_eq!(productos::obtener_producto(&db, producto).unwrap().stock_actual, 10);
        assert_eq!(consultar_credito_disponible(&db, cliente).unwrap(), dec!(0));

        // Ya resuelta no admite otra resolución
        let err = validar_devolucion(&db, &sesion, devolucion.id.unwrap(), true);
        assert!(matches!(err, Err(AppError::Validacion(_))));
    }

    #[test]
    fn test_producto_sin_devolucion() {
        let (db, sesion, cliente) = entorno();
        let mut producto = producto_de_prueba("AN-1");
        producto.admite_devolucion = false;
        let producto_id = productos::crear_producto(&db, producto).unwrap();

        let err = registrar_devolucion(
            &db,
            &sesion,
            cliente,
            producto_id,
            DEVOLUCION_DEFECTO,
            None,
        );
        assert!(matches!(err, Err(AppError::Validacion(_))));
    }

    #[test]
    fn test_tipo_invalido() {
        let (db, sesion, cliente) = entorno();
        let producto = productos::crear_producto(&db, producto_de_prueba("AN-1")).unwrap();
        let err = registrar_devolucion(&db, &sesion, cliente, producto, "ROBO", None);
        assert!(matches!(err, Err(AppError::Validacion(_))));
    }
}
