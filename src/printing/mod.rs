use crate::models::{EntregaParcial, OrdenCliente};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Genera el contenido ESC/POS del ticket de una entrega parcial
pub fn generar_ticket_entrega(
    entrega: &EntregaParcial,
    orden: &OrdenCliente,
    cliente_nombre: &str,
    config: &HashMap<String, String>,
) -> Vec<u8> {
    let ancho = 48; // caracteres para impresora de 80mm (42 para 58mm)
    let mut ticket: Vec<u8> = Vec::new();

    // Comandos ESC/POS
    let esc_init: &[u8] = &[0x1B, 0x40]; // Inicializar impresora
    let esc_center: &[u8] = &[0x1B, 0x61, 0x01]; // Centrar texto
    let esc_left: &[u8] = &[0x1B, 0x61, 0x00]; // Alinear izquierda
    let esc_bold_on: &[u8] = &[0x1B, 0x45, 0x01]; // Negrita on
    let esc_bold_off: &[u8] = &[0x1B, 0x45, 0x00]; // Negrita off
    let esc_double_on: &[u8] = &[0x1B, 0x21, 0x30]; // Doble alto+ancho
    let esc_double_off: &[u8] = &[0x1B, 0x21, 0x00]; // Normal
    let esc_cut: &[u8] = &[0x1D, 0x56, 0x00]; // Corte total
    let esc_feed: &[u8] = &[0x1B, 0x64, 0x04]; // Avanzar 4 líneas

    ticket.extend_from_slice(esc_init);

    // Encabezado - nombre del negocio
    ticket.extend_from_slice(esc_center);
    ticket.extend_from_slice(esc_bold_on);
    let nombre = config
        .get("nombre_negocio")
        .map(|s| s.as_str())
        .unwrap_or("PRONTO SHOES");
    ticket.extend_from_slice(nombre.as_bytes());
    ticket.push(b'\n');
    ticket.extend_from_slice(esc_bold_off);

    if let Some(dir) = config.get("direccion") {
        if !dir.is_empty() {
            ticket.extend_from_slice(format!("{}\n", dir).as_bytes());
        }
    }
    if let Some(tel) = config.get("telefono") {
        if !tel.is_empty() {
            ticket.extend_from_slice(format!("Tel: {}\n", tel).as_bytes());
        }
    }

    ticket.extend_from_slice(esc_bold_on);
    ticket.extend_from_slice(b"ENTREGA PARCIAL\n");
    ticket.extend_from_slice(format!("Ticket {}\n", entrega.numero_ticket).as_bytes());
    ticket.extend_from_slice(esc_bold_off);
    ticket.extend_from_slice(esc_left);

    ticket.extend_from_slice(linea_separador(ancho, '-').as_bytes());

    let fecha = entrega.fecha_entrega.as_deref().unwrap_or("-");
    ticket.extend_from_slice(format!("Fecha: {}\n", fecha).as_bytes());
    ticket.extend_from_slice(format!("Cliente: {}\n", cliente_nombre).as_bytes());
    ticket.extend_from_slice(format!("Orden: {}\n", orden.numero_orden).as_bytes());
    if let Some(usuario) = entrega.usuario.as_deref() {
        ticket.extend_from_slice(format!("Entrega: {}\n", usuario).as_bytes());
    }

    ticket.extend_from_slice(linea_separador(ancho, '-').as_bytes());

    // Cabecera de detalle
    ticket.extend_from_slice(esc_bold_on);
    ticket.extend_from_slice(
        format!("{:<20} {:>5} {:>9} {:>10}\n", "PRODUCTO", "CANT", "P.UNIT", "SUBTOT").as_bytes(),
    );
    ticket.extend_from_slice(esc_bold_off);
    ticket.extend_from_slice(linea_separador(ancho, '-').as_bytes());

    for det in &entrega.productos_entregados {
        // Si el código es muy largo, truncar
        let codigo_corto: String = if det.codigo.len() > 20 {
            det.codigo[..20].to_string()
        } else {
            det.codigo.clone()
        };

        ticket.extend_from_slice(
            format!(
                "{:<20} {:>5} {:>9} {:>10}\n",
                codigo_corto,
                det.cantidad,
                format!("{:.2}", det.precio_unitario),
                format!("{:.2}", det.subtotal),
            )
            .as_bytes(),
        );
    }

    ticket.extend_from_slice(linea_separador(ancho, '=').as_bytes());

    ticket.extend_from_slice(
        linea_texto(
            "Pares entregados:",
            &entrega.total_productos_entregados.to_string(),
            ancho,
        )
        .as_bytes(),
    );

    ticket.extend_from_slice(esc_bold_on);
    ticket.extend_from_slice(esc_double_on);
    ticket.extend_from_slice(esc_center);
    ticket.extend_from_slice(format!("TOTAL: ${:.2}\n", entrega.monto_parcial).as_bytes());
    ticket.extend_from_slice(esc_double_off);
    ticket.extend_from_slice(esc_bold_off);
    ticket.extend_from_slice(esc_left);

    ticket.extend_from_slice(linea_separador(ancho, '-').as_bytes());

    // Avance de la orden
    ticket.extend_from_slice(
        linea_texto(
            "Avance de la orden:",
            &format!(
                "{}/{} ({}%)",
                orden.productos_recibidos,
                orden.total_productos,
                orden.porcentaje_completado()
            ),
            ancho,
        )
        .as_bytes(),
    );
    ticket.extend_from_slice(linea_monto("Total de la orden:", orden.monto_total, ancho).as_bytes());

    if let Some(obs) = entrega.observaciones.as_deref() {
        if !obs.is_empty() {
            ticket.extend_from_slice(format!("Obs: {}\n", obs).as_bytes());
        }
    }

    // Pie
    ticket.push(b'\n');
    ticket.extend_from_slice(esc_center);
    ticket.extend_from_slice(b"Conserve este ticket para\n");
    ticket.extend_from_slice(b"confirmar su entrega\n");
    ticket.extend_from_slice(b"PRONTO SHOES\n");

    ticket.extend_from_slice(esc_feed);
    ticket.extend_from_slice(esc_cut);

    ticket
}

fn linea_separador(ancho: usize, ch: char) -> String {
    format!("{}\n", std::iter::repeat(ch).take(ancho).collect::<String>())
}

fn linea_monto(label: &str, monto: Decimal, ancho: usize) -> String {
    let valor = format!("${:.2}", monto);
    let espacios = ancho.saturating_sub(label.len() + valor.len());
    format!("{}{}{}\n", label, " ".repeat(espacios), valor)
}

fn linea_texto(label: &str, valor: &str, ancho: usize) -> String {
    let espacios = ancho.saturating_sub(label.len() + valor.len());
    format!("{}{}{}\n", label, " ".repeat(espacios), valor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductoEntregado;
    use rust_decimal_macros::dec;

    fn entrega_de_prueba() -> (EntregaParcial, OrdenCliente) {
        let orden = OrdenCliente {
            id: Some(1),
            numero_orden: "ORD-2026-000001".to_string(),
            cliente_id: 1,
            estado: "ACTIVO".to_string(),
            fecha_creacion: None,
            fecha_cierre: None,
            total_productos: 5,
            productos_recibidos: 2,
            monto_total: dec!(400.50),
            anticipos_pagados: dec!(0),
            observaciones: None,
            usuario: None,
        };
        let entrega = EntregaParcial {
            id: Some(1),
            numero_ticket: "EP-ORD-2026-000001-001".to_string(),
            orden_cliente_id: 1,
            total_productos_entregados: 2,
            monto_parcial: dec!(100.00),
            productos_entregados: vec![ProductoEntregado {
                producto_id: 1,
                codigo: "AN-225-NEG-24".to_string(),
                cantidad: 2,
                precio_unitario: dec!(50.00),
                subtotal: dec!(100.00),
            }],
            confirmado_por_cliente: false,
            fecha_entrega: Some("2026-08-07 10:30:00".to_string()),
            usuario: Some("ADMINISTRADOR".to_string()),
            observaciones: None,
        };
        (entrega, orden)
    }

    #[test]
    fn test_ticket_contiene_datos_clave() {
        let (entrega, orden) = entrega_de_prueba();
        let config = HashMap::new();

        let bytes = generar_ticket_entrega(&entrega, &orden, "DISTRIBUIDORA NORTE", &config);
        let texto = String::from_utf8_lossy(&bytes);

        assert!(texto.contains("EP-ORD-2026-000001-001"));
        assert!(texto.contains("DISTRIBUIDORA NORTE"));
        assert!(texto.contains("AN-225-NEG-24"));
        assert!(texto.contains("TOTAL: $100.00"));
        assert!(texto.contains("2/5 (40%)"));
    }

    #[test]
    fn test_ticket_inicia_y_corta() {
        let (entrega, orden) = entrega_de_prueba();
        let bytes = generar_ticket_entrega(&entrega, &orden, "X", &HashMap::new());

        // Inicializa la impresora al comienzo y corta al final
        assert_eq!(&bytes[..2], &[0x1B, 0x40]);
        assert_eq!(&bytes[bytes.len() - 3..], &[0x1D, 0x56, 0x00]);
    }
}
