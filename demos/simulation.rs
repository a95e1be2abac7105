//! Real-time Simulation
//!
//! This example drives the canonical machine from a 10 ms loop on the
//! system clock, with trace output routed through `tracing`.
//!
//! Key concepts:
//! - Periodic tick driver
//! - Posting events from another thread
//! - Normal error recovery and the critical lockout
//!
//! Run with: RUST_LOG=tickfsm=debug cargo run --example simulation

use std::thread;
use std::time::Duration;
use tickfsm::core::{Event, State};
use tickfsm::recovery::{ErrorCode, ErrorLevel};
use tickfsm::{MachineConfig, StateMachine};
use tracing_subscriber::EnvFilter;

fn run_ticks(machine: &mut StateMachine, ticks: usize) {
    let period = Duration::from_millis(u64::from(machine.config().task_period_ms));
    for _ in 0..ticks {
        machine.execute_tick();
        thread::sleep(period);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tickfsm=info")),
        )
        .init();

    println!("=== Tick-driven State Machine Simulation ===\n");

    let mut machine = StateMachine::new(MachineConfig::default()).unwrap();
    println!("Transition table:\n{}", machine.table());

    // Let initialization complete
    run_ticks(&mut machine, 10);
    println!("State after init: {}", machine.current_state());

    // Start from a separate thread, as an interrupt handler would
    let poster = machine.poster();
    thread::spawn(move || poster.post(Event::Start))
        .join()
        .unwrap()
        .unwrap();
    run_ticks(&mut machine, 5);
    println!("State after START: {}", machine.current_state());

    // One full data cycle
    machine.post_event(Event::DataReady).unwrap();
    while machine.current_state() != State::Monitoring {
        run_ticks(&mut machine, 1);
        if machine.current_state() == State::Recovery {
            break;
        }
    }
    println!("State after data cycle: {}", machine.current_state());

    // A normal error the Recovery state can handle
    machine.report_error(ErrorLevel::Normal, ErrorCode::Timeout);
    run_ticks(&mut machine, 5);
    println!("State after recoverable error: {}", machine.current_state());

    // An error with no recovery path
    machine.report_error(ErrorLevel::Normal, ErrorCode::HardwareFault);
    run_ticks(&mut machine, 10);
    println!(
        "State after unrecoverable error: {} (locked out: {})",
        machine.current_state(),
        machine.is_locked_out()
    );

    if let Err(e) = machine.reset() {
        println!("Reset refused: {e}");
    }

    machine.reinitialize();
    println!("State after re-initialization: {}", machine.current_state());

    let stats = machine.stats();
    println!("\nEvents posted since re-initialization: {}", stats.total_events_posted);

    println!("\n=== Simulation Complete ===");
}
