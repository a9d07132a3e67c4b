//! Backend de punto de venta y operaciones de Pronto Shoes: clientes,
//! catálogo, pedidos, órdenes de cliente, notas de crédito, entregas
//! parciales, caja y reportes sobre SQLite.
//!
//! La capa que lo hospeda (shell de escritorio o API) recibe `Database` y
//! `SesionState` y llama las funciones de `commands`.

pub mod commands;
pub mod creditos;
pub mod db;
pub mod error;
pub mod models;
pub mod printing;
pub mod utils;

pub use db::{Database, SesionState};
pub use error::AppError;
