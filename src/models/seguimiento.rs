use serde::{Deserialize, Serialize};

/// Estado de surtido de un producto dentro de una orden de cliente
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeguimientoProducto {
    pub id: Option<i64>,
    pub orden_cliente_id: i64,
    pub producto_id: i64,
    pub cantidad: i64,
    pub estado: String,
    pub fecha_entrega_estimada: Option<String>,
    pub fecha_cambio: Option<String>,
    pub observaciones: Option<String>,
}

/// Estados válidos en orden de avance
pub const ESTADOS_SEGUIMIENTO: [&str; 4] = ["PEDIDO", "PRODUCCION", "LISTO", "ENTREGADO"];

/// Estados que todavía cuentan como pendientes de entrega
pub const ESTADOS_PENDIENTES: [&str; 3] = ["PEDIDO", "PRODUCCION", "LISTO"];

#[derive(Debug, Serialize, Deserialize)]
pub struct SeguimientoConProducto {
    pub seguimiento: SeguimientoProducto,
    pub producto_codigo: String,
    pub numero_orden: String,
}
