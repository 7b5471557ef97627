//! Prints the device tree of an MTConnect Devices document.
//!
//! ```text
//! RUST_LOG=debug cargo run --example inspect_devices -- probe.xml
//! ```

use std::fs;

use mtconnect_model::{
    read_devices_document, validate_devices, Component, DataItem, Device, ReadOptions,
    TypeRegistry,
};
use tracing_subscriber::EnvFilter;

fn marker(registered: bool) -> &'static str {
    if registered { "" } else { " (unregistered)" }
}

fn print_data_items(items: &[DataItem], indent: usize) {
    for item in items {
        let mut line = format!(
            "{:indent$}- {} {} [{}]",
            "",
            item.id,
            item.type_id,
            item.category,
            indent = indent
        );
        if let Some(sub_type) = &item.sub_type {
            line.push_str(&format!(" subType={}", sub_type));
        }
        if let Some(units) = &item.units {
            line.push_str(&format!(" units={}", units));
        }
        if item.representation != Default::default() {
            line.push_str(&format!(" representation={}", item.representation.as_str()));
        }
        println!("{}{}", line, marker(item.resolution.is_registered()));
    }
}

fn print_component(component: &Component, indent: usize) {
    println!(
        "{:indent$}{} id={}{}{}",
        "",
        component.type_id,
        component.id,
        component
            .name
            .as_deref()
            .map(|n| format!(" name={}", n))
            .unwrap_or_default(),
        marker(component.resolution.is_registered()),
        indent = indent
    );
    for composition in &component.compositions {
        println!(
            "{:indent$}  * {} {}{}",
            "",
            composition.id,
            composition.type_id,
            marker(composition.resolution.is_registered()),
            indent = indent
        );
    }
    print_data_items(&component.data_items, indent + 2);
    for child in &component.components {
        print_component(child, indent + 2);
    }
}

fn print_device(device: &Device) {
    println!(
        "\n{} {} (id={}, uuid={}){}",
        device.type_id,
        device.name.as_deref().unwrap_or("<unnamed>"),
        device.id,
        device.uuid.as_deref().unwrap_or("-"),
        marker(device.resolution.is_registered())
    );
    print_data_items(&device.data_items, 2);
    for component in &device.components {
        print_component(component, 2);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "probe.xml".to_string());

    println!("Reading: {}", path);

    let text = fs::read_to_string(&path).expect("Failed to read file");
    println!("File size: {} bytes", text.len());

    let registry = TypeRegistry::global();
    let document = read_devices_document(&text, registry, &ReadOptions::default())
        .expect("Failed to read devices document");

    println!("\n=== Header ===");
    let header = &document.header;
    if let Some(time) = &header.creation_time {
        println!("Created: {}", time);
    }
    if let Some(sender) = &header.sender {
        println!("Sender: {}", sender);
    }
    if let Some(version) = &header.version {
        println!("Version: {}", version);
    }

    println!("\n=== Devices ({}) ===", document.devices.len());
    for device in &document.devices {
        print_device(device);
    }

    let data_items: Vec<&DataItem> = document
        .devices
        .iter()
        .flat_map(|d| d.all_data_items())
        .collect();
    let unregistered = data_items
        .iter()
        .filter(|d| !d.resolution.is_registered())
        .count();
    println!("\n=== Summary ===");
    println!("Data items: {}", data_items.len());
    println!("Unregistered data items: {}", unregistered);

    match validate_devices(&document) {
        Ok(()) => println!("Validation: ok"),
        Err(e) => println!("Validation: {}", e),
    }
}
