/// Static chip description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChipInfo {
    pub chip_name: &'static str,
    pub manufacturer_name: &'static str,
    pub interface: &'static str,
    pub supply_voltage_min_v: f32,
    pub supply_voltage_max_v: f32,
    pub max_current_ma: f32,
    pub temperature_min: f32,
    pub temperature_max: f32,
    pub driver_version: u32,
}

pub const INFO: ChipInfo = ChipInfo {
    chip_name: "Maxim Integrated DS2431",
    manufacturer_name: "Maxim Integrated",
    interface: "GPIO",
    supply_voltage_min_v: 2.8,
    supply_voltage_max_v: 5.25,
    max_current_ma: 0.8,
    temperature_min: -40.0,
    temperature_max: 85.0,
    driver_version: 1000,
};

pub fn info() -> &'static ChipInfo {
    &INFO
}
