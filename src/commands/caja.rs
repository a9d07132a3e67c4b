use crate::commands::usuarios;
use crate::db::{Database, SesionState};
use crate::error::AppError;
use crate::models::{Caja, ResumenCaja, TransaccionCaja, MOVIMIENTO_EGRESO, MOVIMIENTO_INGRESO};
use crate::utils;
use rusqlite::TransactionBehavior;
use rust_decimal::Decimal;
use std::str::FromStr;

fn decimal_opcional(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let texto: Option<String> = row.get(idx)?;
    match texto {
        None => Ok(None),
        Some(t) => Decimal::from_str(&t).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        }),
    }
}

fn mapear_caja(row: &rusqlite::Row) -> rusqlite::Result<Caja> {
    Ok(Caja {
        id: Some(row.get(0)?),
        fecha_apertura: row.get(1)?,
        fecha_cierre: row.get(2)?,
        fondo_inicial: utils::leer_decimal(row, 3)?,
        ingresos: utils::leer_decimal(row, 4)?,
        egresos: utils::leer_decimal(row, 5)?,
        saldo_esperado: utils::leer_decimal(row, 6)?,
        saldo_real: decimal_opcional(row, 7)?,
        diferencia: decimal_opcional(row, 8)?,
        estado: row.get(9)?,
        usuario: row.get(10)?,
        usuario_id: row.get(11)?,
        observacion: row.get(12)?,
    })
}

const COLUMNAS_CAJA: &str = "id, fecha_apertura, fecha_cierre, fondo_inicial, ingresos,
     egresos, saldo_esperado, saldo_real, diferencia, estado, usuario, usuario_id, observacion";

pub fn abrir_caja(
    db: &Database,
    sesion: &SesionState,
    fondo_inicial: Decimal,
) -> Result<Caja, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    if fondo_inicial < Decimal::ZERO {
        return Err(AppError::validacion("El fondo inicial no puede ser negativo"));
    }

    let conn = db.conexion()?;

    let caja_abierta: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM caja WHERE estado = 'ABIERTA'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .unwrap_or(false);

    if caja_abierta {
        return Err(AppError::validacion(
            "Ya existe una caja abierta. Ciérrela primero.",
        ));
    }

    conn.execute(
        "INSERT INTO caja (fondo_inicial, saldo_esperado, estado, usuario, usuario_id)
         VALUES (?1, ?1, 'ABIERTA', ?2, ?3)",
        rusqlite::params![fondo_inicial.to_string(), actual.nombre, actual.usuario_id],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(caja_id = id, usuario = %actual.nombre, "caja abierta");

    Ok(Caja {
        id: Some(id),
        fecha_apertura: None,
        fecha_cierre: None,
        fondo_inicial,
        ingresos: Decimal::ZERO,
        egresos: Decimal::ZERO,
        saldo_esperado: fondo_inicial,
        saldo_real: None,
        diferencia: None,
        estado: "ABIERTA".to_string(),
        usuario: Some(actual.nombre),
        usuario_id: Some(actual.usuario_id),
        observacion: None,
    })
}

/// Movimiento manual de caja (cobros sueltos, gastos, retiros)
pub fn registrar_transaccion(
    db: &Database,
    sesion: &SesionState,
    tipo: &str,
    monto: Decimal,
    descripcion: Option<String>,
    referencia: Option<String>,
) -> Result<TransaccionCaja, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    if tipo != MOVIMIENTO_INGRESO && tipo != MOVIMIENTO_EGRESO {
        return Err(AppError::validacion(format!(
            "Tipo de movimiento no válido: {}",
            tipo
        )));
    }
    if monto <= Decimal::ZERO {
        return Err(AppError::validacion("El monto debe ser mayor a 0"));
    }

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let (caja_id, fondo, ingresos, egresos): (i64, Decimal, Decimal, Decimal) = tx
        .query_row(
            "SELECT id, fondo_inicial, ingresos, egresos FROM caja
             WHERE estado = 'ABIERTA' LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    utils::leer_decimal(row, 1)?,
                    utils::leer_decimal(row, 2)?,
                    utils::leer_decimal(row, 3)?,
                ))
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::validacion("No hay caja abierta"),
            otro => otro.into(),
        })?;

    tx.execute(
        "INSERT INTO transacciones_caja (caja_id, tipo, monto, descripcion, referencia, usuario)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            caja_id,
            tipo,
            monto.to_string(),
            descripcion,
            referencia,
            actual.nombre
        ],
    )?;
    let transaccion_id = tx.last_insert_rowid();

    let (ingresos, egresos) = if tipo == MOVIMIENTO_INGRESO {
        (ingresos + monto, egresos)
    } else {
        (ingresos, egresos + monto)
    };
    let saldo_esperado = fondo + ingresos - egresos;

    tx.execute(
        "UPDATE caja SET ingresos = ?1, egresos = ?2, saldo_esperado = ?3 WHERE id = ?4",
        rusqlite::params![
            ingresos.to_string(),
            egresos.to_string(),
            saldo_esperado.to_string(),
            caja_id
        ],
    )?;

    tx.commit()?;

    Ok(TransaccionCaja {
        id: Some(transaccion_id),
        caja_id,
        tipo: tipo.to_string(),
        monto,
        descripcion,
        referencia,
        fecha: None,
        usuario: Some(actual.nombre),
    })
}

pub fn cerrar_caja(
    db: &Database,
    sesion: &SesionState,
    saldo_real: Decimal,
    observacion: Option<String>,
) -> Result<ResumenCaja, AppError> {
    usuarios::requerir_sesion(sesion)?;

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let (caja_id, fondo, ingresos, egresos): (i64, Decimal, Decimal, Decimal) = tx
        .query_row(
            "SELECT id, fondo_inicial, ingresos, egresos FROM caja
             WHERE estado = 'ABIERTA' LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    utils::leer_decimal(row, 1)?,
                    utils::leer_decimal(row, 2)?,
                    utils::leer_decimal(row, 3)?,
                ))
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::validacion("No hay caja abierta"),
            otro => otro.into(),
        })?;

    let saldo_esperado = fondo + ingresos - egresos;
    let diferencia = saldo_real - saldo_esperado;

    tx.execute(
        "UPDATE caja SET fecha_cierre = datetime('now','localtime'),
         saldo_esperado = ?1, saldo_real = ?2, diferencia = ?3,
         estado = 'CERRADA', observacion = ?4
         WHERE id = ?5",
        rusqlite::params![
            saldo_esperado.to_string(),
            saldo_real.to_string(),
            diferencia.to_string(),
            observacion,
            caja_id
        ],
    )?;

    let num_transacciones: i64 = tx.query_row(
        "SELECT COUNT(*) FROM transacciones_caja WHERE caja_id = ?1",
        rusqlite::params![caja_id],
        |row| row.get(0),
    )?;

    tx.commit()?;

    tracing::info!(caja_id, %diferencia, "caja cerrada");

    // Auto-cerrar sesión al cerrar caja
    usuarios::cerrar_sesion(sesion)?;

    let caja = Caja {
        id: Some(caja_id),
        fecha_apertura: None,
        fecha_cierre: None,
        fondo_inicial: fondo,
        ingresos,
        egresos,
        saldo_esperado,
        saldo_real: Some(saldo_real),
        diferencia: Some(diferencia),
        estado: "CERRADA".to_string(),
        usuario: None,
        usuario_id: None,
        observacion,
    };

    Ok(ResumenCaja {
        caja,
        num_transacciones,
        total_ingresos: ingresos,
        total_egresos: egresos,
    })
}

pub fn obtener_caja_abierta(db: &Database) -> Result<Option<Caja>, AppError> {
    let conn = db.conexion()?;

    let sql = format!(
        "SELECT {} FROM caja WHERE estado = 'ABIERTA' LIMIT 1",
        COLUMNAS_CAJA
    );
    let result = conn.query_row(&sql, [], mapear_caja);

    match result {
        Ok(caja) => Ok(Some(caja)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
