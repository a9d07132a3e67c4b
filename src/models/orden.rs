use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Contenedor del negocio pendiente de una distribuidora, independiente de
/// un pedido puntual. CONSOLIDADO es terminal.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrdenCliente {
    pub id: Option<i64>,
    pub numero_orden: String,
    pub cliente_id: i64,
    pub estado: String,
    pub fecha_creacion: Option<String>,
    pub fecha_cierre: Option<String>,
    pub total_productos: i64,
    pub productos_recibidos: i64,
    pub monto_total: Decimal,
    pub anticipos_pagados: Decimal,
    pub observaciones: Option<String>,
    pub usuario: Option<String>,
}

impl OrdenCliente {
    pub fn porcentaje_completado(&self) -> i64 {
        if self.total_productos == 0 {
            return 0;
        }
        self.productos_recibidos * 100 / self.total_productos
    }

    pub fn esta_completa(&self) -> bool {
        self.total_productos > 0 && self.productos_recibidos >= self.total_productos
    }
}

/// Renglón para crear una orden: producto, cantidad y precio pactado
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ItemOrden {
    pub producto_id: i64,
    pub cantidad: i64,
    pub precio: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrdenConCliente {
    pub orden: OrdenCliente,
    pub cliente_nombre: String,
}
