use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Devolucion {
    pub id: Option<i64>,
    pub cliente_id: i64,
    pub producto_id: i64,
    pub tipo: String,
    pub motivo: Option<String>,
    pub estado: String,
    pub confirmacion_proveedor: bool,
    pub afecta_inventario: bool,
    pub saldo_a_favor_generado: Decimal,
    pub nota_credito_id: Option<i64>,
    pub fecha: Option<String>,
    pub usuario: Option<String>,
}

pub const DEVOLUCION_DEFECTO: &str = "DEFECTO";
pub const DEVOLUCION_CAMBIO: &str = "CAMBIO";
