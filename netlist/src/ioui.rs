use crate::{Circuit, Device};

/// Propagation delay given to promoted clock generators.
pub const CLOCK_PROPAGATION: u32 = 100;

/// Rewrites plain `Input`/`Output` devices of a circuit into interactive controls.
///
/// One-bit inputs labelled `clk` or `clock` become `Clock` generators, other one-bit inputs
/// become `Button`s, wider inputs `NumEntry` widgets. One-bit outputs become `Lamp`s, 8-bit
/// outputs labelled `display7` (or `display7_*`) become seven-segment displays, the rest
/// `NumDisplay` widgets. Only the given circuit is touched; sub-circuit I/O stays as-is since it
/// forms the sub-circuit interface.
pub fn promote_io_devices(circuit: &mut Circuit) {
    for device in circuit.devices.values_mut() {
        match device {
            Device::Input(io) => {
                let mut io = io.clone();
                let net = io.net.clone();
                let label = io.label.get_or_insert_with(|| net).clone();
                *device = if io.bits == 1 && matches!(label.as_str(), "clk" | "clock") {
                    io.propagation = Some(CLOCK_PROPAGATION);
                    Device::Clock(io)
                } else if io.bits == 1 {
                    Device::Button(io)
                } else {
                    Device::NumEntry(io)
                };
            }
            Device::Output(io) => {
                let mut io = io.clone();
                let net = io.net.clone();
                let label = io.label.get_or_insert_with(|| net).clone();
                *device = if io.bits == 1 {
                    Device::Lamp(io)
                } else if io.bits == 8 && (label == "display7" || label.starts_with("display7_")) {
                    Device::Display7(io)
                } else {
                    Device::NumDisplay(io)
                };
            }
            _ => {}
        }
    }
}
