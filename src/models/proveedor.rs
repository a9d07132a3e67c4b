use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Proveedor {
    pub id: Option<i64>,
    pub nombre: String,
    pub contacto: Option<String>,
    pub requiere_anticipo: bool,
    pub activo: bool,
}
