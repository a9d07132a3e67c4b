pub mod caja;
pub mod clientes;
pub mod config;
pub mod creditos;
pub mod devoluciones;
pub mod entregas;
pub mod ordenes;
pub mod pedidos;
pub mod productos;
pub mod proveedores;
pub mod reportes;
pub mod seguimiento;
pub mod usuarios;
