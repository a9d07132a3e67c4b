use crate::db::Database;
use crate::error::AppError;
use crate::models::{SeguimientoConProducto, SeguimientoProducto, ESTADOS_PENDIENTES, ESTADOS_SEGUIMIENTO};
use crate::utils;

fn mapear_seguimiento(row: &rusqlite::Row) -> rusqlite::Result<SeguimientoProducto> {
    Ok(SeguimientoProducto {
        id: Some(row.get(0)?),
        orden_cliente_id: row.get(1)?,
        producto_id: row.get(2)?,
        cantidad: row.get(3)?,
        estado: row.get(4)?,
        fecha_entrega_estimada: row.get(5)?,
        fecha_cambio: row.get(6)?,
        observaciones: row.get(7)?,
    })
}

const COLUMNAS_SEGUIMIENTO: &str = "id, orden_cliente_id, producto_id, cantidad, estado,
     fecha_entrega_estimada, fecha_cambio, observaciones";

/// Cambia el estado de varios registros de seguimiento de un jalón.
/// Retorna cuántos registros se actualizaron.
pub fn actualizar_estado_masivo(
    db: &Database,
    ids: &[i64],
    nuevo_estado: &str,
    observaciones: Option<&str>,
) -> Result<usize, AppError> {
    if !ESTADOS_SEGUIMIENTO.contains(&nuevo_estado) {
        return Err(AppError::validacion(format!(
            "Estado de seguimiento no válido: {}",
            nuevo_estado
        )));
    }
    if ids.is_empty() {
        return Ok(0);
    }

    let conn = db.conexion()?;

    let marcadores: String = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "UPDATE seguimiento_productos
         SET estado = ?, fecha_cambio = ?, observaciones = COALESCE(?, observaciones)
         WHERE id IN ({})",
        marcadores
    );

    let ahora = utils::ahora();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
        Box::new(nuevo_estado.to_string()),
        Box::new(ahora),
        Box::new(observaciones.map(|s| s.to_string())),
    ];
    for id in ids {
        params.push(Box::new(*id));
    }
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let afectados = conn.execute(&sql, param_refs.as_slice())?;

    tracing::info!(afectados, nuevo_estado, "seguimiento actualizado en bloque");

    Ok(afectados)
}

/// Registros que ya pasaron su fecha estimada y siguen sin entregarse
pub fn productos_atrasados(db: &Database) -> Result<Vec<SeguimientoConProducto>, AppError> {
    let conn = db.conexion()?;

    let pendientes: String = ESTADOS_PENDIENTES
        .iter()
        .map(|e| format!("'{}'", e))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT s.id, s.orden_cliente_id, s.producto_id, s.cantidad, s.estado,
                s.fecha_entrega_estimada, s.fecha_cambio, s.observaciones,
                p.codigo, o.numero_orden
         FROM seguimiento_productos s
         JOIN productos p ON s.producto_id = p.id
         JOIN ordenes_cliente o ON s.orden_cliente_id = o.id
         WHERE s.fecha_entrega_estimada < ?1 AND s.estado IN ({})
         ORDER BY s.fecha_entrega_estimada",
        pendientes
    );

    let mut stmt = conn.prepare(&sql)?;
    let atrasados = stmt
        .query_map(rusqlite::params![utils::hoy()], |row| {
            Ok(SeguimientoConProducto {
                seguimiento: mapear_seguimiento(row)?,
                producto_codigo: row.get(8)?,
                numero_orden: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(atrasados)
}

pub fn seguimiento_por_estado(
    db: &Database,
    estado: &str,
) -> Result<Vec<SeguimientoProducto>, AppError> {
    if !ESTADOS_SEGUIMIENTO.contains(&estado) {
        return Err(AppError::validacion(format!(
            "Estado de seguimiento no válido: {}",
            estado
        )));
    }

    let conn = db.conexion()?;
    let sql = format!(
        "SELECT {} FROM seguimiento_productos WHERE estado = ?1 ORDER BY fecha_cambio DESC",
        COLUMNAS_SEGUIMIENTO
    );
    let mut stmt = conn.prepare(&sql)?;
    let registros = stmt
        .query_map(rusqlite::params![estado], mapear_seguimiento)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(registros)
}

pub fn listar_seguimiento_orden(
    db: &Database,
    orden_id: i64,
) -> Result<Vec<SeguimientoProducto>, AppError> {
    let conn = db.conexion()?;
    let sql = format!(
        "SELECT {} FROM seguimiento_productos WHERE orden_cliente_id = ?1 ORDER BY id",
        COLUMNAS_SEGUIMIENTO
    );
    let mut stmt = conn.prepare(&sql)?;
    let registros = stmt
        .query_map(rusqlite::params![orden_id], mapear_seguimiento)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(registros)
}
