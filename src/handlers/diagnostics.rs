use crate::{models::DiagnosticsResponse, AppState};
use axum::{extract::State, Json};
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Room lifecycle counters plus host load
pub async fn diagnostics(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    let hub = &state.hub;
    let n_conn = hub.rooms().connection_count() as u32;
    let n_rooms = hub.rooms().room_count() as u32;
    let n_draining_rooms = hub.cleanup().pending_count() as u32;
    let n_docs = hub.docs().len() as u32;
    let n_released_docs = hub.docs().released_total();

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Rooms: {}, Draining: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        n_rooms,
        n_draining_rooms
    );

    Json(DiagnosticsResponse {
        n_conn,
        n_rooms,
        n_draining_rooms,
        n_docs,
        n_released_docs,
        cleanup_delay_secs: hub.cleanup_delay().as_secs(),
        cpu_usage,
        memory_alloc,
        memory_total,
        memory_free,
    })
}
