pub mod caja;
pub mod cliente;
pub mod devolucion;
pub mod entrega;
pub mod nota_credito;
pub mod orden;
pub mod pedido;
pub mod producto;
pub mod proveedor;
pub mod seguimiento;
pub mod usuario;

pub use caja::*;
pub use cliente::*;
pub use devolucion::*;
pub use entrega::*;
pub use nota_credito::*;
pub use orden::*;
pub use pedido::*;
pub use producto::*;
pub use proveedor::*;
pub use seguimiento::*;
pub use usuario::*;
