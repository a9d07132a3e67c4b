use crate::commands::usuarios;
use crate::db::{self, Database, SesionState};
use crate::error::AppError;
use crate::models::{ItemOrden, OrdenCliente, OrdenConCliente};
use crate::utils;
use rusqlite::TransactionBehavior;
use rust_decimal::Decimal;

const COLUMNAS_ORDEN: &str = "id, numero_orden, cliente_id, estado, fecha_creacion, fecha_cierre,
     total_productos, productos_recibidos, monto_total, anticipos_pagados, observaciones, usuario";

fn mapear_orden(row: &rusqlite::Row) -> rusqlite::Result<OrdenCliente> {
    Ok(OrdenCliente {
        id: Some(row.get(0)?),
        numero_orden: row.get(1)?,
        cliente_id: row.get(2)?,
        estado: row.get(3)?,
        fecha_creacion: row.get(4)?,
        fecha_cierre: row.get(5)?,
        total_productos: row.get(6)?,
        productos_recibidos: row.get(7)?,
        monto_total: utils::leer_decimal(row, 8)?,
        anticipos_pagados: utils::leer_decimal(row, 9)?,
        observaciones: row.get(10)?,
        usuario: row.get(11)?,
    })
}

/// Crea una orden de cliente a partir de sus renglones. El folio es
/// ORD-<año>-NNNNNN con secuencia por año; los totales son la suma de los
/// renglones. Cada renglón queda en seguimiento con estado PEDIDO.
pub fn crear_orden_automatica(
    db: &Database,
    sesion: &SesionState,
    cliente_id: i64,
    items: &[ItemOrden],
) -> Result<OrdenCliente, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    if items.is_empty() {
        return Err(AppError::validacion(
            "La orden debe incluir al menos un producto",
        ));
    }
    for item in items {
        if item.cantidad <= 0 {
            return Err(AppError::validacion(format!(
                "Cantidad no válida para el producto {}",
                item.producto_id
            )));
        }
        if item.precio < Decimal::ZERO {
            return Err(AppError::validacion(format!(
                "Precio no válido para el producto {}",
                item.producto_id
            )));
        }
    }

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let cliente_existe: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM clientes WHERE id = ?1 AND activo = 1",
            rusqlite::params![cliente_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|c| c > 0)
        .unwrap_or(false);
    if !cliente_existe {
        return Err(AppError::no_encontrado(format!(
            "Cliente {} no existe o está inactivo",
            cliente_id
        )));
    }

    let anio = utils::anio_actual();
    let secuencial = db::siguiente_secuencial(&tx, &format!("orden_{}", anio))?;
    let numero_orden = format!("ORD-{}-{:06}", anio, secuencial);

    let total_productos: i64 = items.iter().map(|i| i.cantidad).sum();
    let monto_total: Decimal = items
        .iter()
        .map(|i| Decimal::from(i.cantidad) * i.precio)
        .sum();

    tx.execute(
        "INSERT INTO ordenes_cliente (numero_orden, cliente_id, estado, total_productos,
         monto_total, usuario)
         VALUES (?1, ?2, 'ACTIVO', ?3, ?4, ?5)",
        rusqlite::params![
            numero_orden,
            cliente_id,
            total_productos,
            monto_total.to_string(),
            actual.nombre,
        ],
    )?;

    let orden_id = tx.last_insert_rowid();

    // Alta de seguimiento por renglón
    let dias = db::config_entero(&tx, "dias_entrega_estimada", 15);
    let estimada = utils::fecha_mas_dias(dias);
    for item in items {
        tx.execute(
            "INSERT INTO seguimiento_productos (orden_cliente_id, producto_id, cantidad,
             estado, fecha_entrega_estimada)
             VALUES (?1, ?2, ?3, 'PEDIDO', ?4)",
            rusqlite::params![orden_id, item.producto_id, item.cantidad, estimada],
        )?;
    }

    tx.commit()?;

    tracing::info!(numero = %numero_orden, cliente_id, %monto_total, "orden creada");

    Ok(OrdenCliente {
        id: Some(orden_id),
        numero_orden,
        cliente_id,
        estado: "ACTIVO".to_string(),
        fecha_creacion: None,
        fecha_cierre: None,
        total_productos,
        productos_recibidos: 0,
        monto_total,
        anticipos_pagados: Decimal::ZERO,
        observaciones: None,
        usuario: Some(actual.nombre),
    })
}

/// Consolida varias órdenes ACTIVO de un cliente en una sola. Las órdenes
/// origen pasan a CONSOLIDADO (terminal) y salen de las consultas activas.
/// Si ninguno de los IDs corresponde a una orden válida no se escribe nada.
pub fn consolidar_ordenes(
    db: &Database,
    sesion: &SesionState,
    cliente_id: i64,
    ordenes_ids: &[i64],
) -> Result<OrdenCliente, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    if ordenes_ids.is_empty() {
        return Err(AppError::validacion(
            "No hay órdenes válidas para consolidar",
        ));
    }

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let marcadores: String = ordenes_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT id, total_productos, monto_total FROM ordenes_cliente
         WHERE cliente_id = ? AND estado = 'ACTIVO' AND id IN ({})",
        marcadores
    );

    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(cliente_id)];
    for id in ordenes_ids {
        params.push(Box::new(*id));
    }
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let validas: Vec<(i64, i64, Decimal)> = {
        let mut stmt = tx.prepare(&sql)?;
        let filas = stmt.query_map(param_refs.as_slice(), |row| {
            Ok((row.get(0)?, row.get(1)?, utils::leer_decimal(row, 2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
        filas
    };

    if validas.is_empty() {
        return Err(AppError::validacion(
            "No hay órdenes válidas para consolidar",
        ));
    }

    let total_productos: i64 = validas.iter().map(|(_, t, _)| t).sum();
    let monto_total: Decimal = validas.iter().map(|(_, _, m)| *m).sum();
    let numero_orden = format!("CONS-{}-{}", utils::fecha_compacta(), cliente_id);
    let observaciones = format!("Orden consolidada de {} órdenes", validas.len());

    tx.execute(
        "INSERT INTO ordenes_cliente (numero_orden, cliente_id, estado, total_productos,
         monto_total, observaciones, usuario)
         VALUES (?1, ?2, 'ACTIVO', ?3, ?4, ?5, ?6)",
        rusqlite::params![
            numero_orden,
            cliente_id,
            total_productos,
            monto_total.to_string(),
            observaciones,
            actual.nombre,
        ],
    )?;
    let orden_id = tx.last_insert_rowid();

    let ahora = utils::ahora();
    for (id, _, _) in &validas {
        tx.execute(
            "UPDATE ordenes_cliente
             SET estado = 'CONSOLIDADO', fecha_cierre = ?1, updated_at = ?1
             WHERE id = ?2",
            rusqlite::params![ahora, id],
        )?;
    }

    tx.commit()?;

    tracing::info!(
        numero = %numero_orden,
        origenes = validas.len(),
        %monto_total,
        "órdenes consolidadas"
    );

    Ok(OrdenCliente {
        id: Some(orden_id),
        numero_orden,
        cliente_id,
        estado: "ACTIVO".to_string(),
        fecha_creacion: None,
        fecha_cierre: None,
        total_productos,
        productos_recibidos: 0,
        monto_total,
        anticipos_pagados: Decimal::ZERO,
        observaciones: Some(observaciones),
        usuario: Some(actual.nombre),
    })
}

/// Órdenes en estado ACTIVO o PENDIENTE, opcionalmente de un solo cliente
pub fn listar_ordenes_activas(
    db: &Database,
    cliente_id: Option<i64>,
) -> Result<Vec<OrdenCliente>, AppError> {
    let conn = db.conexion()?;

    let ordenes = if let Some(cid) = cliente_id {
        let sql = format!(
            "SELECT {} FROM ordenes_cliente
             WHERE estado IN ('ACTIVO', 'PENDIENTE') AND cliente_id = ?1
             ORDER BY fecha_creacion DESC",
            COLUMNAS_ORDEN
        );
        let mut stmt = conn.prepare(&sql)?;
        let filas = stmt.query_map(rusqlite::params![cid], mapear_orden)?
            .collect::<Result<Vec<_>, _>>()?;
        filas
    } else {
        let sql = format!(
            "SELECT {} FROM ordenes_cliente
             WHERE estado IN ('ACTIVO', 'PENDIENTE')
             ORDER BY fecha_creacion DESC",
            COLUMNAS_ORDEN
        );
        let mut stmt = conn.prepare(&sql)?;
        let filas = stmt.query_map([], mapear_orden)?
            .collect::<Result<Vec<_>, _>>()?;
        filas
    };

    Ok(ordenes)
}

pub fn obtener_orden(db: &Database, id: i64) -> Result<OrdenConCliente, AppError> {
    let conn = db.conexion()?;

    let sql = "SELECT o.id, o.numero_orden, o.cliente_id, o.estado, o.fecha_creacion,
                o.fecha_cierre, o.total_productos, o.productos_recibidos, o.monto_total,
                o.anticipos_pagados, o.observaciones, o.usuario, cl.nombre
         FROM ordenes_cliente o
         JOIN clientes cl ON o.cliente_id = cl.id
         WHERE o.id = ?1";

    conn.query_row(sql, rusqlite::params![id], |row| {
        Ok(OrdenConCliente {
            orden: mapear_orden(row)?,
            cliente_nombre: row.get(12)?,
        })
    })
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            AppError::no_encontrado(format!("Orden {} no existe", id))
        }
        otro => otro.into(),
    })
}

/// PENDIENTE -> ACTIVO. El disparo viene de fuera (confirmación del cliente).
pub fn confirmar_orden(db: &Database, id: i64) -> Result<(), AppError> {
    let conn = db.conexion()?;

    let afectadas = conn.execute(
        "UPDATE ordenes_cliente
         SET estado = 'ACTIVO', updated_at = datetime('now','localtime')
         WHERE id = ?1 AND estado = 'PENDIENTE'",
        rusqlite::params![id],
    )?;

    if afectadas == 0 {
        return Err(AppError::validacion(format!(
            "La orden {} no existe o no está pendiente",
            id
        )));
    }

    Ok(())
}

/// ACTIVO -> CERRADO, registrando la fecha de cierre
pub fn cerrar_orden(db: &Database, id: i64) -> Result<(), AppError> {
    let conn = db.conexion()?;

    let afectadas = conn.execute(
        "UPDATE ordenes_cliente
         SET estado = 'CERRADO', fecha_cierre = datetime('now','localtime'),
             updated_at = datetime('now','localtime')
         WHERE id = ?1 AND estado = 'ACTIVO'",
        rusqlite::params![id],
    )?;

    if afectadas == 0 {
        return Err(AppError::validacion(format!(
            "La orden {} no existe o no está activa",
            id
        )));
    }

    tracing::info!(orden_id = id, "orden cerrada");

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::commands::clientes::{self, tests::cliente_de_prueba};
    use rust_decimal_macros::dec;

    pub(crate) fn entorno() -> (Database, SesionState, i64) {
        let db = Database::abrir_en_memoria().unwrap();
        let sesion = SesionState::nueva();
        usuarios::iniciar_sesion(&db, &sesion, "0000").unwrap();
        let cliente_id =
            clientes::crear_cliente(&db, cliente_de_prueba("DISTRIBUIDORA NORTE")).unwrap();
        // Productos 1 y 2, referenciados por items_de_prueba
        crate::commands::productos::crear_producto(
            &db,
            crate::commands::productos::tests::producto_de_prueba("BASE-1"),
        )
        .unwrap();
        crate::commands::productos::crear_producto(
            &db,
            crate::commands::productos::tests::producto_de_prueba("BASE-2"),
        )
        .unwrap();
        (db, sesion, cliente_id)
    }

    pub(crate) fn items_de_prueba() -> Vec<ItemOrden> {
        vec![
            ItemOrden {
                producto_id: 1,
                cantidad: 3,
                precio: dec!(100.00),
            },
            ItemOrden {
                producto_id: 2,
                cantidad: 2,
                precio: dec!(50.25),
            },
        ]
    }

    #[test]
    fn test_crear_orden_folio_y_totales() {
        let (db, sesion, cliente) = entorno();

        let orden = crear_orden_automatica(&db, &sesion, cliente, &items_de_prueba()).unwrap();
        let anio = utils::anio_actual();
        assert_eq!(orden.numero_orden, format!("ORD-{}-000001", anio));
        assert_eq!(orden.estado, "ACTIVO");
        assert_eq!(orden.total_productos, 5);
        assert_eq!(orden.monto_total, dec!(400.50));

        let segunda = crear_orden_automatica(&db, &sesion, cliente, &items_de_prueba()).unwrap();
        assert_eq!(segunda.numero_orden, format!("ORD-{}-000002", anio));
    }

    #[test]
    fn test_crear_orden_genera_seguimiento() {
        let (db, sesion, cliente) = entorno();
        let orden = crear_orden_automatica(&db, &sesion, cliente, &items_de_prueba()).unwrap();

        let conn = db.conexion().unwrap();
        let filas: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM seguimiento_productos
                 WHERE orden_cliente_id = ?1 AND estado = 'PEDIDO'",
                rusqlite::params![orden.id.unwrap()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(filas, 2);
    }

    #[test]
    fn test_crear_orden_sin_items() {
        let (db, sesion, cliente) = entorno();
        let err = crear_orden_automatica(&db, &sesion, cliente, &[]);
        assert!(matches!(err, Err(AppError::Validacion(_))));
    }

    #[test]
    fn test_crear_orden_sin_sesion() {
        let db = Database::abrir_en_memoria().unwrap();
        let sesion = SesionState::nueva();
        let err = crear_orden_automatica(&db, &sesion, 1, &items_de_prueba());
        assert!(matches!(err, Err(AppError::Validacion(_))));
    }

    #[test]
    fn test_consolidar_ordenes() {
        let (db, sesion, cliente) = entorno();
        let o1 = crear_orden_automatica(&db, &sesion, cliente, &items_de_prueba()).unwrap();
        let o2 = crear_orden_automatica(&db, &sesion, cliente, &items_de_prueba()).unwrap();

        let consolidada =
            consolidar_ordenes(&db, &sesion, cliente, &[o1.id.unwrap(), o2.id.unwrap()]).unwrap();

        assert_eq!(
            consolidada.numero_orden,
            format!("CONS-{}-{}", utils::fecha_compacta(), cliente)
        );
        assert_eq!(consolidada.total_productos, 10);
        assert_eq!(consolidada.monto_total, dec!(801.00));
        assert_eq!(
            consolidada.observaciones.as_deref(),
            Some("Orden consolidada de 2 órdenes")
        );

        // Las origen quedan CONSOLIDADO y fuera de las activas
        let activas = listar_ordenes_activas(&db, Some(cliente)).unwrap();
        assert_eq!(activas.len(), 1);
        assert_eq!(activas[0].id, consolidada.id);

        let origen = obtener_orden(&db, o1.id.unwrap()).unwrap();
        assert_eq!(origen.orden.estado, "CONSOLIDADO");
        assert!(origen.orden.fecha_cierre.is_some());
    }

    #[test]
    fn test_consolidar_sin_coincidencias() {
        let (db, sesion, cliente) = entorno();
        let otro_cliente =
            clientes::crear_cliente(&db, cliente_de_prueba("ZAPATERIA SUR")).unwrap();
        let ajena = crear_orden_automatica(&db, &sesion, otro_cliente, &items_de_prueba()).unwrap();

        // IDs de otro cliente: ninguna coincide, no se crea nada
        let err = consolidar_ordenes(&db, &sesion, cliente, &[ajena.id.unwrap()]);
        assert!(matches!(err, Err(AppError::Validacion(_))));

        let err = consolidar_ordenes(&db, &sesion, cliente, &[]);
        assert!(matches!(err, Err(AppError::Validacion(_))));

        let conn = db.conexion().unwrap();
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM ordenes_cliente", [], |row| row.get(0))
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_consolidar_ignora_no_activas() {
        let (db, sesion, cliente) = entorno();
        let o1 = crear_orden_automatica(&db, &sesion, cliente, &items_de_prueba()).unwrap();
        let o2 = crear_orden_automatica(&db, &sesion, cliente, &items_de_prueba()).unwrap();
        cerrar_orden(&db, o2.id.unwrap()).unwrap();

        let consolidada =
            consolidar_ordenes(&db, &sesion, cliente, &[o1.id.unwrap(), o2.id.unwrap()]).unwrap();
        // Solo la activa entra a la consolidación
        assert_eq!(consolidada.total_productos, 5);
        assert_eq!(
            consolidada.observaciones.as_deref(),
            Some("Orden consolidada de 1 órdenes")
        );
    }

    #[test]
    fn test_confirmar_orden_pendiente() {
        let (db, sesion, cliente) = entorno();
        let orden = crear_orden_automatica(&db, &sesion, cliente, &items_de_prueba()).unwrap();
        let orden_id = orden.id.unwrap();
        {
            let conn = db.conexion().unwrap();
            conn.execute(
                "UPDATE ordenes_cliente SET estado = 'PENDIENTE' WHERE id = ?1",
                rusqlite::params![orden_id],
            )
            .unwrap();
        }

        // Sigue contando como activa mientras está pendiente
        assert_eq!(listar_ordenes_activas(&db, Some(cliente)).unwrap().len(), 1);

        confirmar_orden(&db, orden_id).unwrap();
        assert_eq!(obtener_orden(&db, orden_id).unwrap().orden.estado, "ACTIVO");

        // Confirmar dos veces es un error
        assert!(confirmar_orden(&db, orden_id).is_err());
    }

    #[test]
    fn test_porcentaje_completado() {
        let orden = OrdenCliente {
            id: None,
            numero_orden: "ORD-2026-000001".to_string(),
            cliente_id: 1,
            estado: "ACTIVO".to_string(),
            fecha_creacion: None,
            fecha_cierre: None,
            total_productos: 8,
            productos_recibidos: 2,
            monto_total: dec!(100),
            anticipos_pagados: dec!(0),
            observaciones: None,
            usuario: None,
        };
        assert_eq!(orden.porcentaje_completado(), 25);
        assert!(!orden.esta_completa());
    }
}
