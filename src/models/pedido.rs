use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Pedido {
    pub id: Option<i64>,
    pub cliente_id: i64,
    pub fecha: Option<String>,
    pub estado: String,
    pub tipo: String,
    pub total: Decimal,
    pub descuento_aplicado: Decimal,
    pub pagado: bool,
    pub orden_cliente_id: Option<i64>,
    pub usuario: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetallePedido {
    pub id: Option<i64>,
    pub pedido_id: Option<i64>,
    pub producto_id: i64,
    pub producto_codigo: Option<String>,
    pub cantidad: i64,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NuevoPedido {
    pub cliente_id: i64,
    pub tipo: String,
    pub descuento_aplicado: Decimal,
    pub items: Vec<DetallePedido>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PedidoCompleto {
    pub pedido: Pedido,
    pub detalles: Vec<DetallePedido>,
    pub cliente_nombre: Option<String>,
}
