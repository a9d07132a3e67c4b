use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Nota de crédito o débito de un cliente. Una nota se aplica completa;
/// el consumo parcial parte la nota en dos (ver creditos::aplicar_credito_a_orden).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotaCredito {
    pub id: Option<i64>,
    pub numero_nota: String,
    pub cliente_id: i64,
    pub tipo: String,
    pub monto: Decimal,
    pub motivo: String,
    pub origen_orden_id: Option<i64>,
    pub orden_aplicacion_id: Option<i64>,
    pub fecha_expiracion: String,
    pub aplicada: bool,
    pub fecha_aplicacion: Option<String>,
}

pub const NOTA_CREDITO: &str = "CREDITO";
pub const NOTA_DEBITO: &str = "DEBITO";

/// Resultado de aplicar crédito a una orden. Si el crédito no alcanza,
/// monto_aplicado queda por debajo de lo solicitado y no es un error.
#[derive(Debug, Serialize, Deserialize)]
pub struct AplicacionCredito {
    pub monto_solicitado: Decimal,
    pub monto_aplicado: Decimal,
    pub notas_utilizadas: Vec<NotaCredito>,
}
