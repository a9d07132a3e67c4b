use crate::commands::usuarios;
use crate::db::{Database, SesionState};
use crate::error::AppError;
use crate::models::{EntregaParcial, ItemOrden, ProductoEntregado, MOVIMIENTO_INGRESO};
use crate::utils;
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use std::str::FromStr;

const COLUMNAS_ENTREGA: &str = "id, numero_ticket, orden_cliente_id, total_productos_entregados,
     monto_parcial, productos_entregados, confirmado_por_cliente, fecha_entrega, usuario, observaciones";

fn mapear_entrega(row: &rusqlite::Row) -> rusqlite::Result<EntregaParcial> {
    let detalle_json: String = row.get(5)?;
    let productos: Vec<ProductoEntregado> = serde_json::from_str(&detalle_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(EntregaParcial {
        id: Some(row.get(0)?),
        numero_ticket: row.get(1)?,
        orden_cliente_id: row.get(2)?,
        total_productos_entregados: row.get(3)?,
        monto_parcial: utils::leer_decimal(row, 4)?,
        productos_entregados: productos,
        confirmado_por_cliente: row.get::<_, i64>(6)? != 0,
        fecha_entrega: row.get(7)?,
        usuario: row.get(8)?,
        observaciones: row.get(9)?,
    })
}

/// Registra la entrega física de parte de una orden. El ticket es
/// EP-<numero de orden>-NNN con secuencia por orden. La suma de entregas
/// no puede rebasar el monto total de la orden.
pub fn crear_entrega_parcial(
    db: &Database,
    sesion: &SesionState,
    orden_id: i64,
    items: &[ItemOrden],
    observaciones: Option<String>,
) -> Result<EntregaParcial, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    if items.is_empty() {
        return Err(AppError::validacion(
            "La entrega debe incluir al menos un producto",
        ));
    }
    for item in items {
        if item.cantidad <= 0 {
            return Err(AppError::validacion(format!(
                "Cantidad no válida para el producto {}",
                item.producto_id
            )));
        }
    }

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let (numero_orden, estado, monto_total): (String, String, Decimal) = tx
        .query_row(
            "SELECT numero_orden, estado, monto_total FROM ordenes_cliente WHERE id = ?1",
            rusqlite::params![orden_id],
            |row| Ok((row.get(0)?, row.get(1)?, utils::leer_decimal(row, 2)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::no_encontrado(format!("Orden {} no existe", orden_id))
            }
            otro => otro.into(),
        })?;

    if estado != "ACTIVO" {
        return Err(AppError::validacion(format!(
            "Solo se entregan órdenes activas; la orden {} está {}",
            numero_orden, estado
        )));
    }

    // Lo ya entregado contra esta orden
    let entregado_previo: Decimal = {
        let mut stmt = tx.prepare(
            "SELECT monto_parcial FROM entregas_parciales WHERE orden_cliente_id = ?1",
        )?;
        let montos = stmt
            .query_map(rusqlite::params![orden_id], |row| {
                utils::leer_decimal(row, 0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        montos.into_iter().sum()
    };

    let total_productos: i64 = items.iter().map(|i| i.cantidad).sum();
    let monto_parcial: Decimal = items
        .iter()
        .map(|i| Decimal::from(i.cantidad) * i.precio)
        .sum();

    if entregado_previo + monto_parcial > monto_total {
        return Err(AppError::validacion(format!(
            "La entrega de ${} rebasa el saldo de la orden (${} de ${} ya entregados)",
            monto_parcial, entregado_previo, monto_total
        )));
    }

    let secuencial: i64 = tx.query_row(
        "SELECT COUNT(*) FROM entregas_parciales WHERE orden_cliente_id = ?1",
        rusqlite::params![orden_id],
        |row| row.get(0),
    )?;
    let numero_ticket = format!("EP-{}-{:03}", numero_orden, secuencial + 1);

    let mut detalle: Vec<ProductoEntregado> = Vec::new();
    for item in items {
        let codigo: String = tx
            .query_row(
                "SELECT codigo FROM productos WHERE id = ?1",
                rusqlite::params![item.producto_id],
                |row| row.get(0),
            )
            .unwrap_or_default();
        detalle.push(ProductoEntregado {
            producto_id: item.producto_id,
            codigo,
            cantidad: item.cantidad,
            precio_unitario: item.precio,
            subtotal: Decimal::from(item.cantidad) * item.precio,
        });
    }
    let detalle_json = serde_json::to_string(&detalle)?;

    tx.execute(
        "INSERT INTO entregas_parciales (numero_ticket, orden_cliente_id,
         total_productos_entregados, monto_parcial, productos_entregados, usuario, observaciones)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            numero_ticket,
            orden_id,
            total_productos,
            monto_parcial.to_string(),
            detalle_json,
            actual.nombre,
            observaciones,
        ],
    )?;
    let entrega_id = tx.last_insert_rowid();

    tx.execute(
        "UPDATE ordenes_cliente
         SET productos_recibidos = productos_recibidos + ?1,
             updated_at = datetime('now','localtime')
         WHERE id = ?2",
        rusqlite::params![total_productos, orden_id],
    )?;

    // Si hay caja abierta, la entrega se registra como ingreso
    registrar_ingreso_caja(&tx, monto_parcial, &numero_ticket, &actual.nombre)?;

    tx.commit()?;

    tracing::info!(ticket = %numero_ticket, orden_id, %monto_parcial, "entrega parcial registrada");

    Ok(EntregaParcial {
        id: Some(entrega_id),
        numero_ticket,
        orden_cliente_id: orden_id,
        total_productos_entregados: total_productos,
        monto_parcial,
        productos_entregados: detalle,
        confirmado_por_cliente: false,
        fecha_entrega: None,
        usuario: Some(actual.nombre),
        observaciones,
    })
}

fn registrar_ingreso_caja(
    conn: &Connection,
    monto: Decimal,
    referencia: &str,
    usuario: &str,
) -> Result<(), AppError> {
    let caja = conn
        .query_row(
            "SELECT id, fondo_inicial, ingresos, egresos FROM caja
             WHERE estado = 'ABIERTA' LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            otro => Err(otro),
        })?;

    let Some((caja_id, fondo, ingresos, egresos)) = caja else {
        return Ok(());
    };

    let fondo = Decimal::from_str(&fondo).unwrap_or_default();
    let ingresos = Decimal::from_str(&ingresos).unwrap_or_default() + monto;
    let egresos = Decimal::from_str(&egresos).unwrap_or_default();

    conn.execute(
        "INSERT INTO transacciones_caja (caja_id, tipo, monto, descripcion, referencia, usuario)
         VALUES (?1, ?2, ?3, 'Entrega parcial', ?4, ?5)",
        rusqlite::params![
            caja_id,
            MOVIMIENTO_INGRESO,
            monto.to_string(),
            referencia,
            usuario
        ],
    )?;
    conn.execute(
        "UPDATE caja SET ingresos = ?1, saldo_esperado = ?2 WHERE id = ?3",
        rusqlite::params![
            ingresos.to_string(),
            (fondo + ingresos - egresos).to_string(),
            caja_id
        ],
    )?;

    Ok(())
}

pub fn obtener_entrega(db: &Database, entrega_id: i64) -> Result<EntregaParcial, AppError> {
    let conn = db.conexion()?;
    let sql = format!(
        "SELECT {} FROM entregas_parciales WHERE id = ?1",
        COLUMNAS_ENTREGA
    );
    conn.query_row(&sql, rusqlite::params![entrega_id], mapear_entrega)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::no_encontrado(format!("Entrega {} no existe", entrega_id))
            }
            otro => otro.into(),
        })
}

/// Ticket imprimible (ESC/POS) de una entrega ya registrada
pub fn ticket_entrega(db: &Database, entrega_id: i64) -> Result<Vec<u8>, AppError> {
    let entrega = obtener_entrega(db, entrega_id)?;
    let con_cliente = crate::commands::ordenes::obtener_orden(db, entrega.orden_cliente_id)?;
    let config = crate::commands::config::obtener_config(db)?;

    Ok(crate::printing::generar_ticket_entrega(
        &entrega,
        &con_cliente.orden,
        &con_cliente.cliente_nombre,
        &config,
    ))
}

/// Confirmación asincrónica por parte del cliente
pub fn confirmar_entrega(db: &Database, entrega_id: i64) -> Result<(), AppError> {
    let conn = db.conexion()?;

    let afectadas = conn.execute(
        "UPDATE entregas_parciales SET confirmado_por_cliente = 1
         WHERE id = ?1 AND confirmado_por_cliente = 0",
        rusqlite::params![entrega_id],
    )?;

    if afectadas == 0 {
        return Err(AppError::validacion(format!(
            "La entrega {} no existe o ya fue confirmada",
            entrega_id
        )));
    }

    Ok(())
}

/// Entregas que el cliente aún no confirma, para seguimiento
pub fn entregas_pendientes_confirmacion(db: &Database) -> Result<Vec<EntregaParcial>, AppError> {
    let conn = db.conexion()?;

    let sql = format!(
        "SELECT {} FROM entregas_parciales
         WHERE confirmado_por_cliente = 0
         ORDER BY fecha_entrega DESC",
        COLUMNAS_ENTREGA
    );
    let mut stmt = conn.prepare(&sql)?;
    let entregas = stmt
        .query_map([], mapear_entrega)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entregas)
}

pub fn listar_entregas_orden(db: &Database, orden_id: i64) -> Result<Vec<EntregaParcial>, AppError> {
    let conn = db.conexion()?;

    let sql = format!(
        "SELECT {} FROM entregas_parciales
         WHERE orden_cliente_id = ?1
         ORDER BY fecha_entrega",
        COLUMNAS_ENTREGA
    );
    let mut stmt = conn.prepare(&sql)?;
    let entregas = stmt
        .query_map(rusqlite::params![orden_id], mapear_entrega)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entregas)
}
