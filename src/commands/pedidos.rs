use crate::commands::usuarios;
use crate::db::{self, Database, SesionState};
use crate::error::AppError;
use crate::models::{DetallePedido, NuevoPedido, OrdenCliente, Pedido, PedidoCompleto};
use crate::utils;
use rusqlite::TransactionBehavior;
use rust_decimal::Decimal;

fn mapear_pedido(row: &rusqlite::Row) -> rusqlite::Result<Pedido> {
    Ok(Pedido {
        id: Some(row.get(0)?),
        cliente_id: row.get(1)?,
        fecha: row.get(2)?,
        estado: row.get(3)?,
        tipo: row.get(4)?,
        total: utils::leer_decimal(row, 5)?,
        descuento_aplicado: utils::leer_decimal(row, 6)?,
        pagado: row.get::<_, i64>(7)? != 0,
        orden_cliente_id: row.get(8)?,
        usuario: row.get(9)?,
    })
}

const COLUMNAS_PEDIDO: &str =
    "id, cliente_id, fecha, estado, tipo, total, descuento_aplicado, pagado, orden_cliente_id, usuario";

/// Registra un pedido con sus renglones. El descuento es un porcentaje
/// sobre el bruto del pedido.
pub fn registrar_pedido(
    db: &Database,
    sesion: &SesionState,
    pedido: NuevoPedido,
) -> Result<PedidoCompleto, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    if pedido.items.is_empty() {
        return Err(AppError::validacion(
            "El pedido debe incluir al menos un producto",
        ));
    }
    if pedido.tipo != "VENTA" && pedido.tipo != "PREVENTIVO" {
        return Err(AppError::validacion(format!(
            "Tipo de pedido no válido: {}",
            pedido.tipo
        )));
    }
    if pedido.descuento_aplicado < Decimal::ZERO || pedido.descuento_aplicado > Decimal::from(100) {
        return Err(AppError::validacion(
            "El descuento debe estar entre 0 y 100 por ciento",
        ));
    }
    for item in &pedido.items {
        if item.cantidad <= 0 {
            return Err(AppError::validacion(format!(
                "Cantidad no válida para el producto {}",
                item.producto_id
            )));
        }
    }

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let cliente_nombre: Option<String> = tx
        .query_row(
            "SELECT nombre FROM clientes WHERE id = ?1 AND activo = 1",
            rusqlite::params![pedido.cliente_id],
            |row| row.get(0),
        )
        .ok();
    if cliente_nombre.is_none() {
        return Err(AppError::no_encontrado(format!(
            "Cliente {} no existe o está inactivo",
            pedido.cliente_id
        )));
    }

    let bruto: Decimal = pedido
        .items
        .iter()
        .map(|i| Decimal::from(i.cantidad) * i.precio_unitario)
        .sum();
    let total = bruto - bruto * pedido.descuento_aplicado / Decimal::from(100);

    tx.execute(
        "INSERT INTO pedidos (cliente_id, estado, tipo, total, descuento_aplicado,
         usuario, usuario_id)
         VALUES (?1, 'PENDIENTE', ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            pedido.cliente_id,
            pedido.tipo,
            total.to_string(),
            pedido.descuento_aplicado.to_string(),
            actual.nombre,
            actual.usuario_id,
        ],
    )?;
    let pedido_id = tx.last_insert_rowid();

    let mut detalles_guardados = Vec::new();
    for item in &pedido.items {
        let subtotal = Decimal::from(item.cantidad) * item.precio_unitario;

        tx.execute(
            "INSERT INTO detalle_pedidos (pedido_id, producto_id, cantidad, precio_unitario, subtotal)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                pedido_id,
                item.producto_id,
                item.cantidad,
                item.precio_unitario.to_string(),
                subtotal.to_string(),
            ],
        )?;

        let codigo: Option<String> = tx
            .query_row(
                "SELECT codigo FROM productos WHERE id = ?1",
                rusqlite::params![item.producto_id],
                |row| row.get(0),
            )
            .ok();

        detalles_guardados.push(DetallePedido {
            id: Some(tx.last_insert_rowid()),
            pedido_id: Some(pedido_id),
            producto_id: item.producto_id,
            producto_codigo: codigo,
            cantidad: item.cantidad,
            precio_unitario: item.precio_unitario,
            subtotal,
        });
    }

    tx.commit()?;

    tracing::info!(pedido_id, cliente_id = pedido.cliente_id, %total, "pedido registrado");

    Ok(PedidoCompleto {
        pedido: Pedido {
            id: Some(pedido_id),
            cliente_id: pedido.cliente_id,
            fecha: None,
            estado: "PENDIENTE".to_string(),
            tipo: pedido.tipo,
            total,
            descuento_aplicado: pedido.descuento_aplicado,
            pagado: false,
            orden_cliente_id: None,
            usuario: Some(actual.nombre),
        },
        detalles: detalles_guardados,
        cliente_nombre,
    })
}

/// PENDIENTE -> SURTIDO, descontando stock de cada renglón
pub fn surtir_pedido(db: &Database, pedido_id: i64) -> Result<(), AppError> {
    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let estado: String = tx
        .query_row(
            "SELECT estado FROM pedidos WHERE id = ?1",
            rusqlite::params![pedido_id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::no_encontrado(format!("Pedido {} no existe", pedido_id))
            }
            otro => otro.into(),
        })?;

    if estado != "PENDIENTE" {
        return Err(AppError::validacion(format!(
            "El pedido {} está {} y no puede surtirse",
            pedido_id, estado
        )));
    }

    let detalles: Vec<(i64, i64)> = {
        let mut stmt =
            tx.prepare("SELECT producto_id, cantidad FROM detalle_pedidos WHERE pedido_id = ?1")?;
        let filas = stmt.query_map(rusqlite::params![pedido_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
        filas
    };

    for (producto_id, cantidad) in detalles {
        tx.execute(
            "UPDATE productos SET stock_actual = stock_actual - ?1,
             updated_at = datetime('now','localtime')
             WHERE id = ?2",
            rusqlite::params![cantidad, producto_id],
        )?;
    }

    tx.execute(
        "UPDATE pedidos SET estado = 'SURTIDO', updated_at = datetime('now','localtime')
         WHERE id = ?1",
        rusqlite::params![pedido_id],
    )?;

    tx.commit()?;

    Ok(())
}

/// Solo los pedidos pendientes pueden cancelarse; el stock no se toca
pub fn cancelar_pedido(db: &Database, pedido_id: i64) -> Result<(), AppError> {
    let conn = db.conexion()?;

    let afectadas = conn.execute(
        "UPDATE pedidos SET estado = 'CANCELADO', updated_at = datetime('now','localtime')
         WHERE id = ?1 AND estado = 'PENDIENTE'",
        rusqlite::params![pedido_id],
    )?;

    if afectadas == 0 {
        return Err(AppError::validacion(format!(
            "El pedido {} no existe o no está pendiente",
            pedido_id
        )));
    }

    Ok(())
}

/// Pliega los pedidos pendientes de un cliente en una nueva orden de
/// cliente. Los pedidos quedan ligados a la orden por orden_cliente_id y
/// cada renglón entra al seguimiento.
pub fn crear_orden_desde_pedidos(
    db: &Database,
    sesion: &SesionState,
    cliente_id: i64,
    pedidos_ids: &[i64],
) -> Result<OrdenCliente, AppError> {
    let actual = usuarios::requerir_sesion(sesion)?;

    if pedidos_ids.is_empty() {
        return Err(AppError::validacion(
            "No se encontraron pedidos válidos para consolidar",
        ));
    }

    let mut conn = db.conexion()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let marcadores: String = pedidos_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT id, total FROM pedidos
         WHERE cliente_id = ? AND estado = 'PENDIENTE' AND orden_cliente_id IS NULL
         AND id IN ({})",
        marcadores
    );

    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(cliente_id)];
    for id in pedidos_ids {
        params.push(Box::new(*id));
    }
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let validos: Vec<(i64, Decimal)> = {
        let mut stmt = tx.prepare(&sql)?;
        let filas = stmt.query_map(param_refs.as_slice(), |row| {
            Ok((row.get(0)?, utils::leer_decimal(row, 1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
        filas
    };

    if validos.is_empty() {
        return Err(AppError::validacion(
            "No se encontraron pedidos válidos para consolidar",
        ));
    }

    let monto_total: Decimal = validos.iter().map(|(_, t)| *t).sum();

    let anio = utils::anio_actual();
    let secuencial = db::siguiente_secuencial(&tx, &format!("orden_{}", anio))?;
    let numero_orden = format!("ORD-{}-{:06}", anio, secuencial);
    let observaciones = format!("Consolidado de {} pedidos", validos.len());

    // Renglones de todos los pedidos, para totales y seguimiento
    let detalles: Vec<(i64, i64)> = {
        let sql_detalles = format!(
            "SELECT d.producto_id, d.cantidad FROM detalle_pedidos d
             WHERE d.pedido_id IN ({})",
            validos
                .iter()
                .map(|_| "?")
                .collect::<Vec<_>>()
                .join(", ")
        );
        let ids: Vec<Box<dyn rusqlite::types::ToSql>> = validos
            .iter()
            .map(|(id, _)| Box::new(*id) as Box<dyn rusqlite::types::ToSql>)
            .collect();
        let refs: Vec<&dyn rusqlite::types::ToSql> = ids.iter().map(|p| p.as_ref()).collect();
        let mut stmt = tx.prepare(&sql_detalles)?;
        let filas = stmt.query_map(refs.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        filas
    };

    let total_productos: i64 = detalles.iter().map(|(_, cantidad)| cantidad).sum();

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

    let dias = db::config_entero(&tx, "dias_entrega_estimada", 15);
    let estimada = utils::fecha_mas_dias(dias);
    for (producto_id, cantidad) in &detalles {
        tx.execute(
            "INSERT INTO seguimiento_productos (orden_cliente_id, producto_id, cantidad,
             estado, fecha_entrega_estimada, observaciones)
             VALUES (?1, ?2, ?3, 'PEDIDO', ?4, ?5)",
            rusqlite::params![
                orden_id,
                producto_id,
                cantidad,
                estimada,
                format!("Consolidado en orden {}", numero_orden)
            ],
        )?;
    }

    for (pedido_id, _) in &validos {
        tx.execute(
            "UPDATE pedidos SET orden_cliente_id = ?1, updated_at = datetime('now','localtime')
             WHERE id = ?2",
            rusqlite::params![orden_id, pedido_id],
        )?;
    }

    tx.commit()?;

    tracing::info!(
        numero = %numero_orden,
        pedidos = validos.len(),
        %monto_total,
        "orden creada desde pedidos"
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

pub fn listar_pedidos_cliente(
    db: &Database,
    cliente_id: i64,
    estado: Option<&str>,
) -> Result<Vec<Pedido>, AppError> {
    let conn = db.conexion()?;

    let pedidos = if let Some(est) = estado {
        let sql = format!(
            "SELECT {} FROM pedidos WHERE cliente_id = ?1 AND estado = ?2 ORDER BY fecha DESC",
            COLUMNAS_PEDIDO
        );
        let mut stmt = conn.prepare(&sql)?;
        let filas = stmt.query_map(rusqlite::params![cliente_id, est], mapear_pedido)?
            .collect::<Result<Vec<_>, _>>()?;
        filas
    } else {
        let sql = format!(
            "SELECT {} FROM pedidos WHERE cliente_id = ?1 ORDER BY fecha DESC",
            COLUMNAS_PEDIDO
        );
        let mut stmt = conn.prepare(&sql)?;
        let filas = stmt.query_map(rusqlite::params![cliente_id], mapear_pedido)?
            .collect::<Result<Vec<_>, _>>()?;
        filas
    };

    Ok(pedidos)
}

pub fn obtener_pedido(db: &Database, id: i64) -> Result<PedidoCompleto, AppError> {
    let conn = db.conexion()?;

    let sql = format!("SELECT {} FROM pedidos WHERE id = ?1", COLUMNAS_PEDIDO);
    let pedido = conn
        .query_row(&sql, rusqlite::params![id], mapear_pedido)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::no_encontrado(format!("Pedido {} no existe", id))
            }
            otro => otro.into(),
        })?;

    let mut stmt = conn.prepare(
        "SELECT d.id, d.pedido_id, d.producto_id, p.codigo, d.cantidad,
                d.precio_unitario, d.subtotal
         FROM detalle_pedidos d
         JOIN productos p ON d.producto_id = p.id
         WHERE d.pedido_id = ?1",
    )?;
    let detalles = stmt
        .query_map(rusqlite::params![id], |row| {
            Ok(DetallePedido {
                id: Some(row.get(0)?),
                pedido_id: Some(row.get(1)?),
                producto_id: row.get(2)?,
                producto_codigo: Some(row.get(3)?),
                cantidad: row.get(4)?,
                precio_unitario: utils::leer_decimal(row, 5)?,
                subtotal: utils::leer_decimal(row, 6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let cliente_nombre: Option<String> = conn
        .query_row(
            "SELECT nombre FROM clientes WHERE id = ?1",
            rusqlite::params![pedido.cliente_id],
            |row| row.get(0),
        )
        .ok();

    Ok(PedidoCompleto {
        pedido,
        detalles,
        cliente_nombre,
    })
}
