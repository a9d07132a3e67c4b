use crate::db::Database;
use crate::error::AppError;
use crate::models::Proveedor;

pub fn crear_proveedor(db: &Database, proveedor: Proveedor) -> Result<i64, AppError> {
    if proveedor.nombre.trim().is_empty() {
        return Err(AppError::validacion(
            "El nombre del proveedor es obligatorio",
        ));
    }

    let conn = db.conexion()?;

    conn.execute(
        "INSERT INTO proveedores (nombre, contacto, requiere_anticipo, activo)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            proveedor.nombre.trim(),
            proveedor.contacto,
            proveedor.requiere_anticipo as i32,
            proveedor.activo as i32,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn actualizar_proveedor(db: &Database, proveedor: Proveedor) -> Result<(), AppError> {
    let conn = db.conexion()?;
    let id = proveedor
        .id
        .ok_or_else(|| AppError::validacion("ID requerido para actualizar"))?;

    let afectadas = conn.execute(
        "UPDATE proveedores SET nombre=?1, contacto=?2, requiere_anticipo=?3, activo=?4,
         updated_at=datetime('now','localtime')
         WHERE id=?5",
        rusqlite::params![
            proveedor.nombre.trim(),
            proveedor.contacto,
            proveedor.requiere_anticipo as i32,
            proveedor.activo as i32,
            id,
        ],
    )?;

    if afectadas == 0 {
        return Err(AppError::no_encontrado(format!(
            "Proveedor {} no existe",
            id
        )));
    }

    Ok(())
}

pub fn listar_proveedores(db: &Database) -> Result<Vec<Proveedor>, AppError> {
    let conn = db.conexion()?;

    let mut stmt = conn.prepare(
        "SELECT id, nombre, contacto, requiere_anticipo, activo
         FROM proveedores WHERE activo = 1 ORDER BY nombre",
    )?;
    let proveedores = stmt
        .query_map([], |row| {
            Ok(Proveedor {
                id: Some(row.get(0)?),
                nombre: row.get(1)?,
                contacto: row.get(2)?,
                requiere_anticipo: row.get::<_, i64>(3)? != 0,
                activo: row.get::<_, i64>(4)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(proveedores)
}
