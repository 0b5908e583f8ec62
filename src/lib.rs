#[macro_use]
mod logging;

mod codec;
mod export;
mod io;
mod macro_tree;
mod macros;
mod settings;
mod store;

use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let builder = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_os::init())
        .plugin(tauri_plugin_dialog::init());

    let builder = builder.setup(|app| {
        // Load the persisted UI state (macro tree, monitor choices)
        if let Err(e) = store::initialise(app.handle()) {
            eprintln!("[setup] Failed to load UI state: {}", e);
        }

        // Start file logging in the app log directory
        match app.path().app_log_dir() {
            Ok(log_dir) => {
                if let Err(e) = logging::init_file_logging(&log_dir) {
                    eprintln!("[setup] Failed to start file logging: {}", e);
                }
            }
            Err(e) => {
                eprintln!("[setup] Failed to resolve app log dir: {}", e);
            }
        }

        Ok(())
    });

    let builder = builder.invoke_handler(tauri::generate_handler![
        settings::load_settings,
        settings::save_settings,
        settings::validate_directory,
        settings::create_directory,
        settings::get_app_version,
        settings::check_for_updates,
        // Encoding conversion API
        codec::convert_ascii_cmd,
        codec::convert_to_ascii_cmd,
        // Macro templating API
        macros::create_new_variable_cmd,
        macros::add_variable_cmd,
        macros::remove_variable_cmd,
        macros::rebalance_vars_cmd,
        macros::build_sequence_cmd,
        macros::build_transmit_message_cmd,
        macros::append_commands_cmd,
        // Macro tree API
        macro_tree::search_node_cmd,
        macro_tree::delete_node_cmd,
        macro_tree::replace_node_cmd,
        macro_tree::collect_as_list_cmd,
        macro_tree::reset_edit_mode_cmd,
        macro_tree::load_macros,
        macro_tree::save_macros,
        // Export API
        export::build_export_content_cmd,
        export::export_data,
        // Serial port API
        io::serial::list_serial_ports,
        io::serial::connect_port,
        io::serial::disconnect_port,
        io::serial::port_status,
        io::serial::send_data,
        io::serial::send_macro,
        io::serial::parser_supports_conversion,
        // Persisted UI state API
        store::load_monitor_prefs,
        store::save_monitor_prefs,
    ]);

    builder
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
