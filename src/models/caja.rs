use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Caja {
    pub id: Option<i64>,
    pub fecha_apertura: Option<String>,
    pub fecha_cierre: Option<String>,
    pub fondo_inicial: Decimal,
    pub ingresos: Decimal,
    pub egresos: Decimal,
    pub saldo_esperado: Decimal,
    pub saldo_real: Option<Decimal>,
    pub diferencia: Option<Decimal>,
    pub estado: String,
    pub usuario: Option<String>,
    pub usuario_id: Option<i64>,
    pub observacion: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransaccionCaja {
    pub id: Option<i64>,
    pub caja_id: i64,
    pub tipo: String,
    pub monto: Decimal,
    pub descripcion: Option<String>,
    pub referencia: Option<String>,
    pub fecha: Option<String>,
    pub usuario: Option<String>,
}

pub const MOVIMIENTO_INGRESO: &str = "INGRESO";
pub const MOVIMIENTO_EGRESO: &str = "EGRESO";

#[derive(Debug, Serialize, Deserialize)]
pub struct ResumenCaja {
    pub caja: Caja,
    pub num_transacciones: i64,
    pub total_ingresos: Decimal,
    pub total_egresos: Decimal,
}
