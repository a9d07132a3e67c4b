use crate::commands::usuarios;
use crate::creditos;
use crate::db::{Database, SesionState};
use crate::error::AppError;
use crate::models::{AplicacionCredito, NotaCredito};
use crate::utils;
use rusqlite::TransactionBehavior;
use rust_decimal::Decimal;

/// Aplica crédito del cliente a una orden. Con `monto` en None se aplica
/// todo lo que la orden admita; con un monto explícito se aplica a lo sumo
/// ese monto, acotado por lo que le falta a la orden. La orden acumula lo
/// aplicado en anticipos_pagados dentro de la misma transacción que
/// consume las notas.
pub fn aplicar_credito(
    db: &Database,
    sesion: &SesionState,
    cliente_id: i64,
    orden_id: i64,
    monto: Option<Decimal>,
) -> Result<AplicacionCredito, AppError> {
    usuarios::requerir_sesion(sesion)?;

    if let Some(m) = monto {
        if m <= Decimal::ZERO {
            return Err(AppError::validacion(
                "El monto a aplicar debe ser mayor a cero",
            ));
        }
    }

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let (monto_total, anticipos): (Decimal, Decimal) = tx
        .query_row(
            "SELECT monto_total, anticipos_pagados FROM ordenes_cliente
             WHERE id = ?1 AND cliente_id = ?2",
            rusqlite::params![orden_id, cliente_id],
            |row| Ok((utils::leer_decimal(row, 0)?, utils::leer_decimal(row, 1)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::validacion(format!(
                "La orden {} no existe o no es del cliente {}",
                orden_id, cliente_id
            )),
            otro => otro.into(),
        })?;

    let restante_orden = monto_total - anticipos;
    if restante_orden <= Decimal::ZERO {
        return Err(AppError::validacion("La orden ya está cubierta"));
    }

    let solicitado = match monto {
        Some(m) => m.min(restante_orden),
        None => restante_orden,
    };

    let (aplicado, notas_utilizadas) =
        creditos::aplicar_credito_a_orden(&tx, cliente_id, solicitado, orden_id)?;

    if aplicado > Decimal::ZERO {
        tx.execute(
            "UPDATE ordenes_cliente
             SET anticipos_pagados = ?1, updated_at = datetime('now','localtime')
             WHERE id = ?2",
            rusqlite::params![(anticipos + aplicado).to_string(), orden_id],
        )?;
    }

    tx.commit()?;

    Ok(AplicacionCredito {
        monto_solicitado: solicitado,
        monto_aplicado: aplicado,
        notas_utilizadas,
    })
}

/// Alta manual de una nota de crédito o débito por el personal
pub fn crear_nota_manual(
    db: &Database,
    sesion: &SesionState,
    cliente_id: i64,
    tipo: &str,
    monto: Decimal,
    motivo: &str,
) -> Result<NotaCredito, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let cliente_existe: bool = tx
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

    let nota = creditos::crear_nota_automatica(
        &tx,
        cliente_id,
        monto,
        tipo,
        None,
        motivo,
        Some(&actual.nombre),
    )?;

    tx.commit()?;
    Ok(nota)
}

pub fn consultar_credito_disponible(db: &Database, cliente_id: i64) -> Result<Decimal, AppError> {
    let conn = db.conexion()?;
    creditos::credito_disponible(&conn, cliente_id)
}

pub fn listar_notas_vigentes(db: &Database, cliente_id: i64) -> Result<Vec<NotaCredito>, AppError> {
    let conn = db.conexion()?;
    creditos::notas_vigentes(&conn, cliente_id)
}

pub fn listar_notas_vencidas(db: &Database, cliente_id: i64) -> Result<Vec<NotaCredito>, AppError> {
    let conn = db.conexion()?;
    creditos::notas_vencidas(&conn, cliente_id)
}
