//! Libro de crédito de clientes: notas de crédito/débito y su aplicación
//! contra órdenes de cliente.
//!
//! Las funciones operan sobre una conexión ya tomada; las que escriben deben
//! invocarse dentro de la transacción del comando que las usa, para que la
//! nota consumida y la orden acreditada queden en el mismo commit.

use crate::db;
use crate::error::AppError;
use crate::models::{NotaCredito, NOTA_CREDITO, NOTA_DEBITO};
use crate::utils;
use rusqlite::Connection;
use rust_decimal::Decimal;

const COLUMNAS_NOTA: &str = "id, numero_nota, cliente_id, tipo, monto, motivo,
     origen_orden_id, orden_aplicacion_id, fecha_expiracion, aplicada, fecha_aplicacion";

fn mapear_nota(row: &rusqlite::Row) -> rusqlite::Result<NotaCredito> {
    Ok(NotaCredito {
        id: Some(row.get(0)?),
        numero_nota: row.get(1)?,
        cliente_id: row.get(2)?,
        tipo: row.get(3)?,
        monto: utils::leer_decimal(row, 4)?,
        motivo: row.get(5)?,
        origen_orden_id: row.get(6)?,
        orden_aplicacion_id: row.get(7)?,
        fecha_expiracion: row.get(8)?,
        aplicada: row.get::<_, i64>(9)? != 0,
        fecha_aplicacion: row.get(10)?,
    })
}

/// Notas sin aplicar y sin vencer de un cliente, las próximas a vencer primero
pub fn notas_vigentes(conn: &Connection, cliente_id: i64) -> Result<Vec<NotaCredito>, AppError> {
    let sql = format!(
        "SELECT {} FROM notas_credito
         WHERE cliente_id = ?1 AND aplicada = 0 AND fecha_expiracion > ?2
         ORDER BY fecha_expiracion, id",
        COLUMNAS_NOTA
    );
    let mut stmt = conn.prepare(&sql)?;
    let notas = stmt
        .query_map(rusqlite::params![cliente_id, utils::ahora()], mapear_nota)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(notas)
}

/// Notas sin aplicar que ya vencieron. Se reportan, nunca se consumen solas.
pub fn notas_vencidas(conn: &Connection, cliente_id: i64) -> Result<Vec<NotaCredito>, AppError> {
    let sql = format!(
        "SELECT {} FROM notas_credito
         WHERE cliente_id = ?1 AND aplicada = 0 AND fecha_expiracion <= ?2
         ORDER BY fecha_expiracion, id",
        COLUMNAS_NOTA
    );
    let mut stmt = conn.prepare(&sql)?;
    let notas = stmt
        .query_map(rusqlite::params![cliente_id, utils::ahora()], mapear_nota)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(notas)
}

/// Crédito disponible del cliente: suma de créditos vigentes menos débitos
/// vigentes. No se recorta en cero; un saldo negativo significa que el
/// cliente debe más de lo que tiene a favor.
pub fn credito_disponible(conn: &Connection, cliente_id: i64) -> Result<Decimal, AppError> {
    let mut disponible = Decimal::ZERO;
    for nota in notas_vigentes(conn, cliente_id)? {
        if nota.tipo == NOTA_DEBITO {
            disponible -= nota.monto;
        } else {
            disponible += nota.monto;
        }
    }
    Ok(disponible)
}

/// Crea una nota de crédito/débito con folio NC-YYYYMMDD-NNNNNN y vigencia
/// tomada de la configuración (60 días por defecto).
pub fn crear_nota_automatica(
    conn: &Connection,
    cliente_id: i64,
    monto: Decimal,
    tipo: &str,
    origen_orden_id: Option<i64>,
    motivo: &str,
    usuario: Option<&str>,
) -> Result<NotaCredito, AppError> {
    if tipo != NOTA_CREDITO && tipo != NOTA_DEBITO {
        return Err(AppError::validacion(format!(
            "Tipo de nota no válido: {}",
            tipo
        )));
    }
    if monto < Decimal::ZERO {
        return Err(AppError::validacion(
            "El monto de una nota no puede ser negativo",
        ));
    }

    let secuencial = db::siguiente_secuencial(conn, "nota_credito")?;
    let numero_nota = format!("NC-{}-{:06}", utils::fecha_compacta(), secuencial);

    let dias = db::config_entero(conn, "dias_vigencia_nota_credito", 60);
    let fecha_expiracion = utils::fecha_mas_dias(dias);

    conn.execute(
        "INSERT INTO notas_credito (numero_nota, cliente_id, tipo, monto, motivo,
         origen_orden_id, fecha_expiracion, usuario)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            numero_nota,
            cliente_id,
            tipo,
            monto.to_string(),
            motivo,
            origen_orden_id,
            fecha_expiracion,
            usuario,
        ],
    )?;

    tracing::info!(numero = %numero_nota, %monto, tipo, "nota creada");

    Ok(NotaCredito {
        id: Some(conn.last_insert_rowid()),
        numero_nota,
        cliente_id,
        tipo: tipo.to_string(),
        monto,
        motivo: motivo.to_string(),
        origen_orden_id,
        orden_aplicacion_id: None,
        fecha_expiracion,
        aplicada: false,
        fecha_aplicacion: None,
    })
}

/// Aplica crédito del cliente contra una orden, consumiendo notas vigentes
/// de tipo CREDITO en orden de vencimiento (la más próxima primero).
///
/// Una nota que excede el restante se parte: se crea `<numero>-RESTO` con el
/// sobrante y la misma fecha de vencimiento, y la original queda aplicada por
/// exactamente el restante. Si el crédito no alcanza se aplica lo que haya;
/// el llamador compara el monto devuelto contra el solicitado.
///
/// No toca la orden destino; acreditarla es responsabilidad del comando.
pub fn aplicar_credito_a_orden(
    conn: &Connection,
    cliente_id: i64,
    monto_aplicar: Decimal,
    orden_id: i64,
) -> Result<(Decimal, Vec<NotaCredito>), AppError> {
    if monto_aplicar <= Decimal::ZERO {
        return Err(AppError::validacion(
            "El monto a aplicar debe ser mayor a cero",
        ));
    }

    let disponibles: Vec<NotaCredito> = notas_vigentes(conn, cliente_id)?
        .into_iter()
        .filter(|n| n.tipo == NOTA_CREDITO)
        .collect();

    let ahora = utils::ahora();
    let mut restante = monto_aplicar;
    let mut utilizadas: Vec<NotaCredito> = Vec::new();

    for mut nota in disponibles {
        if restante <= Decimal::ZERO {
            break;
        }

        let nota_id = nota.id.ok_or_else(|| {
            AppError::Concurrencia("nota sin id al aplicar crédito".to_string())
        })?;

        if nota.monto <= restante {
            // Consumir la nota completa
            conn.execute(
                "UPDATE notas_credito
                 SET aplicada = 1, fecha_aplicacion = ?1, orden_aplicacion_id = ?2
                 WHERE id = ?3 AND aplicada = 0",
                rusqlite::params![ahora, orden_id, nota_id],
            )?;
            restante -= nota.monto;
        } else {
            // Consumo parcial: el sobrante nace como nota nueva
            let numero_resto = format!("{}-RESTO", nota.numero_nota);
            let sobrante = nota.monto - restante;
            conn.execute(
                "INSERT INTO notas_credito (numero_nota, cliente_id, tipo, monto, motivo,
                 fecha_expiracion)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    numero_resto,
                    cliente_id,
                    NOTA_CREDITO,
                    sobrante.to_string(),
                    format!("Resto de {}", nota.numero_nota),
                    nota.fecha_expiracion,
                ],
            )?;

            conn.execute(
                "UPDATE notas_credito
                 SET monto = ?1, aplicada = 1, fecha_aplicacion = ?2, orden_aplicacion_id = ?3
                 WHERE id = ?4 AND aplicada = 0",
                rusqlite::params![restante.to_string(), ahora, orden_id, nota_id],
            )?;
            nota.monto = restante;
            restante = Decimal::ZERO;
        }

        nota.aplicada = true;
        nota.fecha_aplicacion = Some(ahora.clone());
        nota.orden_aplicacion_id = Some(orden_id);
        utilizadas.push(nota);
    }

    let aplicado = monto_aplicar - restante;

    if aplicado < monto_aplicar {
        tracing::warn!(
            cliente_id,
            solicitado = %monto_aplicar,
            aplicado = %aplicado,
            "crédito insuficiente, aplicación parcial"
        );
    } else {
        tracing::info!(cliente_id, orden_id, aplicado = %aplicado, "crédito aplicado");
    }

    Ok((aplicado, utilizadas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use rust_decimal_macros::dec;

    fn base_con_cliente() -> (Database, i64) {
        let db = Database::abrir_en_memoria().unwrap();
        let cliente_id = {
            let conn = db.conexion().unwrap();
            conn.execute(
                "INSERT INTO clientes (nombre) VALUES ('DISTRIBUIDORA NORTE')",
                [],
            )
            .unwrap();
            conn.last_insert_rowid()
        };
        (db, cliente_id)
    }

    fn orden_de_prueba(conn: &Connection, cliente_id: i64, numero: &str) -> i64 {
        conn.execute(
            "INSERT INTO ordenes_cliente (numero_orden, cliente_id, monto_total)
             VALUES (?1, ?2, '500')",
            rusqlite::params![numero, cliente_id],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn insertar_nota(
        conn: &Connection,
        cliente_id: i64,
        numero: &str,
        tipo: &str,
        monto: Decimal,
        dias_vigencia: i64,
    ) {
        conn.execute(
            "INSERT INTO notas_credito (numero_nota, cliente_id, tipo, monto, fecha_expiracion)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                numero,
                cliente_id,
                tipo,
                monto.to_string(),
                utils::fecha_mas_dias(dias_vigencia)
            ],
        )
        .unwrap();
    }

    #[test]
    fn test_credito_disponible_resta_debitos() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        insertar_nota(&conn, cliente, "NC-1", NOTA_CREDITO, dec!(100.00), 30);
        insertar_nota(&conn, cliente, "NC-2", NOTA_DEBITO, dec!(25.50), 30);

        assert_eq!(credito_disponible(&conn, cliente).unwrap(), dec!(74.50));
    }

    #[test]
    fn test_credito_disponible_ignora_vencidas_y_aplicadas() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        insertar_nota(&conn, cliente, "NC-1", NOTA_CREDITO, dec!(100), 30);
        // Vencida hace 5 días
        insertar_nota(&conn, cliente, "NC-2", NOTA_CREDITO, dec!(40), -5);
        // Aplicada
        insertar_nota(&conn, cliente, "NC-3", NOTA_CREDITO, dec!(70), 30);
        conn.execute(
            "UPDATE notas_credito SET aplicada = 1 WHERE numero_nota = 'NC-3'",
            [],
        )
        .unwrap();

        assert_eq!(credito_disponible(&conn, cliente).unwrap(), dec!(100));
        assert_eq!(notas_vigentes(&conn, cliente).unwrap().len(), 1);
        let vencidas = notas_vencidas(&conn, cliente).unwrap();
        assert_eq!(vencidas.len(), 1);
        assert_eq!(vencidas[0].numero_nota, "NC-2");
    }

    #[test]
    fn test_credito_disponible_puede_ser_negativo() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        insertar_nota(&conn, cliente, "NC-1", NOTA_CREDITO, dec!(20), 30);
        insertar_nota(&conn, cliente, "ND-1", NOTA_DEBITO, dec!(50), 30);

        assert_eq!(credito_disponible(&conn, cliente).unwrap(), dec!(-30));
    }

    #[test]
    fn test_crear_nota_automatica_folio_y_vigencia() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        let nota = crear_nota_automatica(
            &conn,
            cliente,
            dec!(150.00),
            NOTA_CREDITO,
            None,
            "Ajuste de pedido",
            Some("ADMINISTRADOR"),
        )
        .unwrap();

        let prefijo = format!("NC-{}-", utils::fecha_compacta());
        assert!(nota.numero_nota.starts_with(&prefijo));
        assert!(nota.numero_nota.ends_with("000001"));
        assert!(!nota.aplicada);
        // Vigencia por defecto de 60 días (comparamos solo la fecha calendario)
        let esperada = utils::fecha_mas_dias(60);
        assert_eq!(&nota.fecha_expiracion[..10], &esperada[..10]);

        let segunda = crear_nota_automatica(
            &conn,
            cliente,
            dec!(10),
            NOTA_DEBITO,
            None,
            "Cargo por flete",
            None,
        )
        .unwrap();
        assert!(segunda.numero_nota.ends_with("000002"));
    }

    #[test]
    fn test_crear_nota_monto_negativo_rechazado() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        let err = crear_nota_automatica(&conn, cliente, dec!(-1), NOTA_CREDITO, None, "", None);
        assert!(matches!(err, Err(AppError::Validacion(_))));
    }

    #[test]
    fn test_aplicar_consume_notas_completas() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        let orden = orden_de_prueba(&conn, cliente, "ORD-2026-000001");
        insertar_nota(&conn, cliente, "NC-1", NOTA_CREDITO, dec!(30), 10);
        insertar_nota(&conn, cliente, "NC-2", NOTA_CREDITO, dec!(50), 40);

        let (aplicado, notas) = aplicar_credito_a_orden(&conn, cliente, dec!(80), orden).unwrap();

        assert_eq!(aplicado, dec!(80));
        assert_eq!(notas.len(), 2);
        assert!(notas.iter().all(|n| n.aplicada));
        assert_eq!(credito_disponible(&conn, cliente).unwrap(), dec!(0));
    }

    #[test]
    fn test_aplicar_parte_nota_excedente() {
        // Escenario de referencia: $30 vence en 10 días, $50 en 40 días,
        // se aplican $40 a una orden.
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        let orden = orden_de_prueba(&conn, cliente, "ORD-2026-000001");
        insertar_nota(&conn, cliente, "NC-10", NOTA_CREDITO, dec!(30), 10);
        insertar_nota(&conn, cliente, "NC-11", NOTA_CREDITO, dec!(50), 40);

        let (aplicado, notas) = aplicar_credito_a_orden(&conn, cliente, dec!(40), orden).unwrap();

        assert_eq!(aplicado, dec!(40.00));
        assert_eq!(notas.len(), 2);
        // La de $30 se consumió completa
        assert_eq!(notas[0].numero_nota, "NC-10");
        assert_eq!(notas[0].monto, dec!(30));
        // La de $50 quedó aplicada por $10 exactos
        assert_eq!(notas[1].numero_nota, "NC-11");
        assert_eq!(notas[1].monto, dec!(10));
        assert_eq!(notas[1].orden_aplicacion_id, Some(orden));

        // El sobrante vive como nota -RESTO con la misma vigencia
        let resto = notas_vigentes(&conn, cliente).unwrap();
        assert_eq!(resto.len(), 1);
        assert_eq!(resto[0].numero_nota, "NC-11-RESTO");
        assert_eq!(resto[0].monto, dec!(40));
        assert_eq!(credito_disponible(&conn, cliente).unwrap(), dec!(40));
    }

    #[test]
    fn test_particion_conserva_saldo() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        let orden = orden_de_prueba(&conn, cliente, "ORD-2026-000001");
        insertar_nota(&conn, cliente, "NC-1", NOTA_CREDITO, dec!(75.33), 20);

        let antes = credito_disponible(&conn, cliente).unwrap();
        let (aplicado, _) = aplicar_credito_a_orden(&conn, cliente, dec!(12.08), orden).unwrap();
        let despues = credito_disponible(&conn, cliente).unwrap();

        assert_eq!(antes - aplicado, despues);
        assert_eq!(despues, dec!(63.25));
    }

    #[test]
    fn test_aplicar_mas_de_lo_disponible() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        let orden = orden_de_prueba(&conn, cliente, "ORD-2026-000001");
        insertar_nota(&conn, cliente, "NC-1", NOTA_CREDITO, dec!(30), 10);
        insertar_nota(&conn, cliente, "NC-2", NOTA_CREDITO, dec!(50), 40);

        let (aplicado, notas) = aplicar_credito_a_orden(&conn, cliente, dec!(100), orden).unwrap();

        assert_eq!(aplicado, dec!(80));
        assert!(aplicado < dec!(100));
        assert_eq!(notas.len(), 2);
        assert_eq!(credito_disponible(&conn, cliente).unwrap(), dec!(0));
    }

    #[test]
    fn test_aplicar_consume_proximas_a_vencer_primero() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        let orden = orden_de_prueba(&conn, cliente, "ORD-2026-000001");
        // Insertadas en orden inverso al de vencimiento
        insertar_nota(&conn, cliente, "NC-LEJANA", NOTA_CREDITO, dec!(50), 40);
        insertar_nota(&conn, cliente, "NC-PROXIMA", NOTA_CREDITO, dec!(30), 10);

        let (aplicado, notas) = aplicar_credito_a_orden(&conn, cliente, dec!(30), orden).unwrap();

        assert_eq!(aplicado, dec!(30));
        assert_eq!(notas.len(), 1);
        assert_eq!(notas[0].numero_nota, "NC-PROXIMA");

        let vigentes = notas_vigentes(&conn, cliente).unwrap();
        assert_eq!(vigentes.len(), 1);
        assert_eq!(vigentes[0].numero_nota, "NC-LEJANA");
        assert_eq!(vigentes[0].monto, dec!(50));
    }

    #[test]
    fn test_aplicar_monto_no_positivo_rechazado() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        let orden = orden_de_prueba(&conn, cliente, "ORD-2026-000001");
        insertar_nota(&conn, cliente, "NC-1", NOTA_CREDITO, dec!(30), 10);

        for monto in [dec!(0), dec!(-5)] {
            let err = aplicar_credito_a_orden(&conn, cliente, monto, orden);
            assert!(matches!(err, Err(AppError::Validacion(_))));
        }
        // Sin efectos secundarios
        assert_eq!(credito_disponible(&conn, cliente).unwrap(), dec!(30));
    }

    #[test]
    fn test_aplicar_ignora_debitos_y_vencidas() {
        let (db, cliente) = base_con_cliente();
        let conn = db.conexion().unwrap();
        let orden = orden_de_prueba(&conn, cliente, "ORD-2026-000001");
        insertar_nota(&conn, cliente, "ND-1", NOTA_DEBITO, dec!(100), 30);
        insertar_nota(&conn, cliente, "NC-VENCIDA", NOTA_CREDITO, dec!(100), -1);
        insertar_nota(&conn, cliente, "NC-1", NOTA_CREDITO, dec!(25), 30);

        let (aplicado, notas) = aplicar_credito_a_orden(&conn, cliente, dec!(200), orden).unwrap();

        assert_eq!(aplicado, dec!(25));
        assert_eq!(notas.len(), 1);
        assert_eq!(notas[0].numero_nota, "NC-1");
    }
}
