use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EntregaParcial {
    pub id: Option<i64>,
    pub numero_ticket: String,
    pub orden_cliente_id: i64,
    pub total_productos_entregados: i64,
    pub monto_parcial: Decimal,
    pub productos_entregados: Vec<ProductoEntregado>,
    pub confirmado_por_cliente: bool,
    pub fecha_entrega: Option<String>,
    pub usuario: Option<String>,
    pub observaciones: Option<String>,
}

/// Detalle de lo entregado, se persiste como JSON dentro de la entrega
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProductoEntregado {
    pub producto_id: i64,
    pub codigo: String,
    pub cantidad: i64,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
}
