// src/io/serial.rs
//
// Serial port connection handling: port enumeration, opening a port with the
// stored line settings, a reader thread that frames the incoming stream into
// data records, and transmission of outgoing messages.

use chrono::Utc;
use once_cell::sync::Lazy;
use serde::Serialize;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::{AppHandle, Emitter};

use super::framer::{unescape_delimiter, FramingMode, SerialFramer};
use super::{bytes_to_text, text_to_bytes, ConnectionStatus};
use crate::codec::DataRecord;
use crate::macros::{build_transmit_message, MacroData};
use crate::settings::{self, AppSettings, ParserKind};

// ============================================================================
// Types
// ============================================================================

/// Information about an available serial port.
#[derive(Clone, Serialize)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

/// The currently open connection. Only one port can be open at a time.
struct ActiveConnection {
    port_name: String,
    writer: Box<dyn SerialPort>,
    cancel_flag: Arc<AtomicBool>,
}

static CONNECTION: Lazy<Mutex<Option<ActiveConnection>>> = Lazy::new(|| Mutex::new(None));

// ============================================================================
// Setting Conversion Helpers
// ============================================================================

fn data_bits_from(value: u8) -> DataBits {
    match value {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

fn stop_bits_from(value: u8) -> StopBits {
    match value {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

fn parity_from(value: &str) -> Parity {
    match value.to_lowercase().as_str() {
        "even" => Parity::Even,
        "odd" => Parity::Odd,
        _ => Parity::None,
    }
}

fn flow_control_from(settings: &AppSettings) -> FlowControl {
    if settings.serialport_rtscts {
        FlowControl::Hardware
    } else if settings.serialport_xon || settings.serialport_xoff {
        FlowControl::Software
    } else {
        FlowControl::None
    }
}

/// Build the framing mode for the parser selected in the settings.
fn framing_from_settings(settings: &AppSettings) -> FramingMode {
    match settings.selected_parser {
        ParserKind::ByteLength => FramingMode::ByteLength {
            length: settings.parser_byte_length,
        },
        ParserKind::Delimiter => FramingMode::Delimiter {
            delimiter: text_to_bytes(&unescape_delimiter(&settings.parser_delimiter)),
            include_delimiter: settings.parser_include_delimiter,
        },
        ParserKind::Regex => FramingMode::Regex {
            pattern: settings.parser_regex.clone(),
        },
        ParserKind::Ready => FramingMode::Ready {
            delimiter: text_to_bytes(&unescape_delimiter(&settings.ready_parser_delimiter)),
        },
    }
}

// ============================================================================
// Reader Thread
// ============================================================================

/// Emit one record per frame, or one record per byte when the byte
/// delimiter is forced.
fn emit_frame(app: &AppHandle, frame: &[u8], force_byte_delimiter: bool) {
    if force_byte_delimiter {
        for &byte in frame {
            let record = DataRecord::from_value(&bytes_to_text(&[byte]));
            let _ = app.emit("receive-data", &record);
        }
    } else {
        let record = DataRecord::from_value(&bytes_to_text(frame));
        let _ = app.emit("receive-data", &record);
    }
}

fn spawn_reader_thread(
    app: AppHandle,
    mut reader: Box<dyn SerialPort>,
    mut framer: SerialFramer,
    force_byte_delimiter: bool,
    cancel_flag: Arc<AtomicBool>,
) {
    std::thread::spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            if cancel_flag.load(Ordering::Relaxed) {
                break;
            }
            match reader.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => {
                    for frame in framer.feed(&buf[..n]) {
                        emit_frame(&app, &frame, force_byte_delimiter);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tlog!("[serial] Read failed, closing connection: {}", e);
                    if let Some(frame) = framer.flush() {
                        emit_frame(&app, &frame, force_byte_delimiter);
                    }
                    if let Ok(mut guard) = CONNECTION.lock() {
                        *guard = None;
                    }
                    let _ = app.emit("port-status", ConnectionStatus::Disconnected);
                    return;
                }
            }
        }
        // Orderly shutdown: emit whatever is still buffered
        if let Some(frame) = framer.flush() {
            emit_frame(&app, &frame, force_byte_delimiter);
        }
    });
}

// ============================================================================
// Tauri Commands
// ============================================================================

/// List the serial ports available on this machine.
#[tauri::command]
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, String> {
    let ports = serialport::available_ports()
        .map_err(|e| format!("Failed to list serial ports: {}", e))?;

    Ok(ports
        .into_iter()
        .map(|p| match p.port_type {
            serialport::SerialPortType::UsbPort(info) => SerialPortInfo {
                port_name: p.port_name,
                port_type: "usb".to_string(),
                manufacturer: info.manufacturer,
                product: info.product,
                serial_number: info.serial_number,
                vid: Some(info.vid),
                pid: Some(info.pid),
            },
            serialport::SerialPortType::BluetoothPort => SerialPortInfo {
                port_name: p.port_name,
                port_type: "bluetooth".to_string(),
                manufacturer: None,
                product: None,
                serial_number: None,
                vid: None,
                pid: None,
            },
            serialport::SerialPortType::PciPort => SerialPortInfo {
                port_name: p.port_name,
                port_type: "pci".to_string(),
                manufacturer: None,
                product: None,
                serial_number: None,
                vid: None,
                pid: None,
            },
            serialport::SerialPortType::Unknown => SerialPortInfo {
                port_name: p.port_name,
                port_type: "unknown".to_string(),
                manufacturer: None,
                product: None,
                serial_number: None,
                vid: None,
                pid: None,
            },
        })
        .collect())
}

/// Open a connection on the given port. Every stored line setting is
/// applied; the parser selected in the settings frames the incoming stream.
/// Validation problems are reported as a status, not as an error.
#[tauri::command]
pub async fn connect_port(
    app: AppHandle,
    port: String,
    baud_rate: u32,
) -> Result<ConnectionStatus, String> {
    if port.is_empty() {
        let _ = app.emit("port-status", ConnectionStatus::NoPortSelected);
        return Ok(ConnectionStatus::NoPortSelected);
    }
    if baud_rate == 0 {
        let _ = app.emit("port-status", ConnectionStatus::NoBaudRateSelected);
        return Ok(ConnectionStatus::NoBaudRateSelected);
    }
    {
        let guard = CONNECTION
            .lock()
            .map_err(|e| format!("Failed to lock connection: {}", e))?;
        if guard.is_some() {
            let _ = app.emit("port-status", ConnectionStatus::PortAlreadyOpen);
            return Ok(ConnectionStatus::PortAlreadyOpen);
        }
    }

    let app_settings = settings::load_settings(app.clone()).await?;

    // lock and hupcl have no counterpart in serialport-rs
    let connection = serialport::new(&port, baud_rate)
        .data_bits(data_bits_from(app_settings.serialport_data_bits))
        .stop_bits(stop_bits_from(app_settings.serialport_stop_bits))
        .parity(parity_from(&app_settings.serialport_parity))
        .flow_control(flow_control_from(&app_settings))
        .timeout(Duration::from_millis(100))
        .open()
        .map_err(|e| format!("Failed to open '{}': {}", port, e))?;

    // Discard anything buffered by the OS from before the connection
    let _ = connection.clear(ClearBuffer::All);

    let reader = connection
        .try_clone()
        .map_err(|e| format!("Failed to clone port handle: {}", e))?;

    let framer = SerialFramer::new(framing_from_settings(&app_settings));
    let cancel_flag = Arc::new(AtomicBool::new(false));
    spawn_reader_thread(
        app.clone(),
        reader,
        framer,
        app_settings.force_byte_delimiter,
        cancel_flag.clone(),
    );

    {
        let mut guard = CONNECTION
            .lock()
            .map_err(|e| format!("Failed to lock connection: {}", e))?;
        *guard = Some(ActiveConnection {
            port_name: port.clone(),
            writer: connection,
            cancel_flag,
        });
    }

    tlog!("[serial] Connected to '{}' at {} baud", port, baud_rate);
    let _ = app.emit("port-status", ConnectionStatus::Connected);
    Ok(ConnectionStatus::Connected)
}

/// Close the open connection, if any.
#[tauri::command]
pub fn disconnect_port(app: AppHandle) -> Result<(), String> {
    let connection = {
        let mut guard = CONNECTION
            .lock()
            .map_err(|e| format!("Failed to lock connection: {}", e))?;
        guard.take()
    };

    if let Some(mut connection) = connection {
        connection.cancel_flag.store(true, Ordering::Relaxed);
        let _ = connection.writer.flush();
        tlog!("[serial] Disconnected from '{}'", connection.port_name);
    }

    let _ = app.emit("port-status", ConnectionStatus::Disconnected);
    Ok(())
}

/// Current connection state.
#[tauri::command]
pub fn port_status() -> ConnectionStatus {
    match CONNECTION.lock() {
        Ok(guard) if guard.is_some() => ConnectionStatus::Connected,
        _ => ConnectionStatus::Disconnected,
    }
}

/// Transmit a raw message string. The transmitted characters are echoed
/// back on the `send-data` event as records so the monitor can show them.
#[tauri::command]
pub fn send_data(app: AppHandle, message: String) -> Result<(), String> {
    let mut guard = CONNECTION
        .lock()
        .map_err(|e| format!("Failed to lock connection: {}", e))?;

    let Some(connection) = guard.as_mut() else {
        let _ = app.emit("port-status", ConnectionStatus::Disconnected);
        return Ok(());
    };

    let bytes = text_to_bytes(&message);
    if let Err(e) = connection.writer.write_all(&bytes) {
        let _ = app.emit("port-status", ConnectionStatus::PortNotWritable);
        return Err(format!("Failed to write to port: {}", e));
    }

    // Echo the sent characters for the monitor
    let timestamp = Utc::now();
    let points: Vec<DataRecord> = message
        .chars()
        .map(|c| DataRecord::with_timestamp(timestamp, &c.to_string()))
        .collect();
    let _ = app.emit("send-data", &points);

    Ok(())
}

/// Resolve a macro and transmit it.
#[tauri::command]
pub fn send_macro(app: AppHandle, data: MacroData) -> Result<(), String> {
    send_data(app, build_transmit_message(&data))
}

/// Whether the selected parser delimits single bytes, which is what makes
/// per-byte encoding conversion in the monitor meaningful.
#[tauri::command]
pub async fn parser_supports_conversion(app: AppHandle) -> Result<bool, String> {
    let app_settings = settings::load_settings(app).await?;
    Ok(
        (app_settings.selected_parser == ParserKind::ByteLength
            && app_settings.parser_byte_length == 1)
            || app_settings.force_byte_delimiter,
    )
}
