use crate::creditos;
use crate::db::Database;
use crate::error::AppError;
use crate::models::{NotaCredito, ProductoBusqueda};
use crate::utils;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ReporteOrdenes {
    pub ordenes_activas: i64,
    pub ordenes_pendientes: i64,
    pub monto_total_activas: Decimal,
    pub monto_total_pendientes: Decimal,
    pub clientes_con_ordenes_activas: i64,
    pub promedio_productos_por_orden: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotaConCliente {
    pub nota: NotaCredito,
    pub cliente_nombre: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResumenCreditoCliente {
    pub cliente_id: i64,
    pub credito_disponible: Decimal,
    pub notas_vigentes: i64,
    pub notas_vencidas: i64,
    pub monto_vencido: Decimal,
}

/// Fotografía de las órdenes abiertas para el tablero de administración
pub fn resumen_ordenes_pendientes(db: &Database) -> Result<ReporteOrdenes, AppError> {
    let conn = db.conexion()?;

    let mut activas = 0i64;
    let mut pendientes = 0i64;
    let mut monto_activas = Decimal::ZERO;
    let mut monto_pendientes = Decimal::ZERO;
    let mut productos_activas = 0i64;

    {
        let mut stmt = conn.prepare(
            "SELECT estado, monto_total, total_productos FROM ordenes_cliente
             WHERE estado IN ('ACTIVO', 'PENDIENTE')",
        )?;
        let filas = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                utils::leer_decimal(row, 1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        for fila in filas {
            let (estado, monto, productos) = fila?;
            if estado == "ACTIVO" {
                activas += 1;
                monto_activas += monto;
                productos_activas += productos;
            } else {
                pendientes += 1;
                monto_pendientes += monto;
            }
        }
    }

    let clientes_activos: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT cliente_id) FROM ordenes_cliente WHERE estado = 'ACTIVO'",
        [],
        |row| row.get(0),
    )?;

    let promedio = if activas > 0 {
        productos_activas as f64 / activas as f64
    } else {
        0.0
    };

    Ok(ReporteOrdenes {
        ordenes_activas: activas,
        ordenes_pendientes: pendientes,
        monto_total_activas: monto_activas,
        monto_total_pendientes: monto_pendientes,
        clientes_con_ordenes_activas: clientes_activos,
        promedio_productos_por_orden: promedio,
    })
}

/// Notas vigentes que vencen dentro de los próximos N días
pub fn notas_por_vencer(db: &Database, dias: i64) -> Result<Vec<NotaConCliente>, AppError> {
    let conn = db.conexion()?;
    let limite = utils::fecha_mas_dias(dias);

    let mut stmt = conn.prepare(
        "SELECT n.id, n.numero_nota, n.cliente_id, n.tipo, n.monto, n.motivo,
                n.origen_orden_id, n.orden_aplicacion_id, n.fecha_expiracion,
                n.aplicada, n.fecha_aplicacion, c.nombre
         FROM notas_credito n
         JOIN clientes c ON n.cliente_id = c.id
         WHERE n.aplicada = 0 AND n.fecha_expiracion > ?1 AND n.fecha_expiracion <= ?2
         ORDER BY n.fecha_expiracion",
    )?;

    let notas = stmt
        .query_map(rusqlite::params![utils::ahora(), limite], |row| {
            Ok(NotaConCliente {
                nota: NotaCredito {
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
                },
                cliente_nombre: row.get(11)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(notas)
}

/// Estado del crédito de un cliente: saldo, vigentes y lo ya perdido
pub fn resumen_credito_cliente(
    db: &Database,
    cliente_id: i64,
) -> Result<ResumenCreditoCliente, AppError> {
    let conn = db.conexion()?;

    let disponible = creditos::credito_disponible(&conn, cliente_id)?;
    let vigentes = creditos::notas_vigentes(&conn, cliente_id)?;
    let vencidas = creditos::notas_vencidas(&conn, cliente_id)?;
    let monto_vencido: Decimal = vencidas.iter().map(|n| n.monto).sum();

    Ok(ResumenCreditoCliente {
        cliente_id,
        credito_disponible: disponible,
        notas_vigentes: vigentes.len() as i64,
        notas_vencidas: vencidas.len() as i64,
        monto_vencido,
    })
}

/// Productos activos en o por debajo de su stock mínimo
pub fn alertas_stock_bajo(db: &Database) -> Result<Vec<ProductoBusqueda>, AppError> {
    let conn = db.conexion()?;

    let mut stmt = conn.prepare(
        "SELECT p.id, p.codigo, p.marca, p.modelo, p.color, p.precio,
                p.stock_actual, p.stock_minimo, c.nombre
         FROM productos p
         LEFT JOIN catalogos c ON p.catalogo_id = c.id
         WHERE p.activo = 1 AND p.stock_actual <= p.stock_minimo
         ORDER BY p.stock_actual",
    )?;

    let productos = stmt
        .query_map([], |row| {
            Ok(ProductoBusqueda {
                id: row.get(0)?,
                codigo: row.get(1)?,
                marca: row.get(2)?,
                modelo: row.get(3)?,
                color: row.get(4)?,
                precio: utils::leer_decimal(row, 5)?,
                stock_actual: row.get(6)?,
                stock_minimo: row.get(7)?,
                catalogo_nombre: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(productos)
}
