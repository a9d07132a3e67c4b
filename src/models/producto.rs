use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Producto {
    pub id: Option<i64>,
    pub codigo: String,
    pub marca: String,
    pub modelo: String,
    pub color: String,
    /// Propiedad variable del modelo, normalmente la talla
    pub propiedad: Option<String>,
    pub costo: Decimal,
    pub precio: Decimal,
    pub temporada: Option<String>,
    pub oferta: bool,
    pub admite_devolucion: bool,
    pub stock_actual: i64,
    pub stock_minimo: i64,
    pub proveedor_id: Option<i64>,
    pub catalogo_id: Option<i64>,
    pub activo: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductoBusqueda {
    pub id: i64,
    pub codigo: String,
    pub marca: String,
    pub modelo: String,
    pub color: String,
    pub precio: Decimal,
    pub stock_actual: i64,
    pub stock_minimo: i64,
    pub catalogo_nombre: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Catalogo {
    pub id: Option<i64>,
    pub nombre: String,
    pub temporada: Option<String>,
    pub es_oferta: bool,
    pub activo: bool,
    pub fecha_inicio_vigencia: Option<String>,
    pub fecha_fin_vigencia: Option<String>,
}
