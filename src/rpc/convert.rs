//! Conversions between catalog records and their protobuf messages.
//!
//! Outbound conversions are infallible. Inbound ones reject what the
//! domain types cannot represent (a missing sub-message, an unknown enum
//! value, an out-of-range timestamp) with `InvalidArgument`.

use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use tonic::Status;

use super::pb;
use crate::model::{
    Cpu, Filter, Gpu, Keyboard, KeyboardLayout, Laptop, Memory, MemoryUnit, Panel, Resolution,
    Screen, Storage, StorageDriver, Weight,
};

fn required<T>(field: Option<T>, name: &str) -> Result<T, Status> {
    field.ok_or_else(|| Status::invalid_argument(format!("{name} is required")))
}

fn known<E: TryFrom<i32>>(value: i32, name: &str) -> Result<E, Status> {
    E::try_from(value).map_err(|_| Status::invalid_argument(format!("unknown {name}: {value}")))
}

// =============================================================================
// Memory
// =============================================================================

impl From<MemoryUnit> for pb::MemoryUnit {
    fn from(unit: MemoryUnit) -> Self {
        match unit {
            MemoryUnit::Bit => Self::Bit,
            MemoryUnit::Byte => Self::Byte,
            MemoryUnit::Kilobyte => Self::Kilobyte,
            MemoryUnit::Megabyte => Self::Megabyte,
            MemoryUnit::Gigabyte => Self::Gigabyte,
            MemoryUnit::Terabyte => Self::Terabyte,
        }
    }
}

impl From<Memory> for pb::Memory {
    fn from(memory: Memory) -> Self {
        Self {
            value: memory.value,
            unit: pb::MemoryUnit::from(memory.unit) as i32,
        }
    }
}

impl TryFrom<pb::Memory> for Memory {
    type Error = Status;

    fn try_from(memory: pb::Memory) -> Result<Self, Status> {
        let unit = match known(memory.unit, "memory unit")? {
            pb::MemoryUnit::Unknown => {
                return Err(Status::invalid_argument("memory unit must be set"));
            },
            pb::MemoryUnit::Bit => MemoryUnit::Bit,
            pb::MemoryUnit::Byte => MemoryUnit::Byte,
            pb::MemoryUnit::Kilobyte => MemoryUnit::Kilobyte,
            pb::MemoryUnit::Megabyte => MemoryUnit::Megabyte,
            pb::MemoryUnit::Gigabyte => MemoryUnit::Gigabyte,
            pb::MemoryUnit::Terabyte => MemoryUnit::Terabyte,
        };
        Ok(Memory::new(memory.value, unit))
    }
}

fn memory(field: Option<pb::Memory>, name: &str) -> Result<Memory, Status> {
    Memory::try_from(required(field, name)?)
}

// =============================================================================
// Components
// =============================================================================

impl From<Cpu> for pb::Cpu {
    fn from(cpu: Cpu) -> Self {
        Self {
            brand: cpu.brand,
            name: cpu.name,
            number_cores: cpu.number_cores,
            number_threads: cpu.number_threads,
            min_ghz: cpu.min_ghz,
            max_ghz: cpu.max_ghz,
        }
    }
}

impl From<pb::Cpu> for Cpu {
    fn from(cpu: pb::Cpu) -> Self {
        Self {
            brand: cpu.brand,
            name: cpu.name,
            number_cores: cpu.number_cores,
            number_threads: cpu.number_threads,
            min_ghz: cpu.min_ghz,
            max_ghz: cpu.max_ghz,
        }
    }
}

impl From<Gpu> for pb::Gpu {
    fn from(gpu: Gpu) -> Self {
        Self {
            brand: gpu.brand,
            name: gpu.name,
            min_ghz: gpu.min_ghz,
            max_ghz: gpu.max_ghz,
            memory: Some(gpu.memory.into()),
        }
    }
}

impl TryFrom<pb::Gpu> for Gpu {
    type Error = Status;

    fn try_from(gpu: pb::Gpu) -> Result<Self, Status> {
        Ok(Self {
            memory: memory(gpu.memory, "gpu memory")?,
            brand: gpu.brand,
            name: gpu.name,
            min_ghz: gpu.min_ghz,
            max_ghz: gpu.max_ghz,
        })
    }
}

impl From<Storage> for pb::Storage {
    fn from(storage: Storage) -> Self {
        let driver = match storage.driver {
            StorageDriver::Unknown => pb::StorageDriver::Unknown,
            StorageDriver::Hdd => pb::StorageDriver::Hdd,
            StorageDriver::Ssd => pb::StorageDriver::Ssd,
        };
        Self {
            driver: driver as i32,
            memory: Some(storage.memory.into()),
        }
    }
}

impl TryFrom<pb::Storage> for Storage {
    type Error = Status;

    fn try_from(storage: pb::Storage) -> Result<Self, Status> {
        let driver = match known(storage.driver, "storage driver")? {
            pb::StorageDriver::Unknown => StorageDriver::Unknown,
            pb::StorageDriver::Hdd => StorageDriver::Hdd,
            pb::StorageDriver::Ssd => StorageDriver::Ssd,
        };
        Ok(Self {
            driver,
            memory: memory(storage.memory, "storage memory")?,
        })
    }
}

impl From<Screen> for pb::Screen {
    fn from(screen: Screen) -> Self {
        let panel = match screen.panel {
            Panel::Unknown => pb::Panel::Unknown,
            Panel::Ips => pb::Panel::Ips,
            Panel::Oled => pb::Panel::Oled,
        };
        Self {
            size_inch: screen.size_inch,
            resolution: Some(pb::Resolution {
                width: screen.resolution.width,
                height: screen.resolution.height,
            }),
            panel: panel as i32,
            multitouch: screen.multitouch,
        }
    }
}

impl TryFrom<pb::Screen> for Screen {
    type Error = Status;

    fn try_from(screen: pb::Screen) -> Result<Self, Status> {
        let resolution = required(screen.resolution, "screen resolution")?;
        let panel = match known(screen.panel, "screen panel")? {
            pb::Panel::Unknown => Panel::Unknown,
            pb::Panel::Ips => Panel::Ips,
            pb::Panel::Oled => Panel::Oled,
        };
        Ok(Self {
            size_inch: screen.size_inch,
            resolution: Resolution {
                width: resolution.width,
                height: resolution.height,
            },
            panel,
            multitouch: screen.multitouch,
        })
    }
}

impl From<Keyboard> for pb::Keyboard {
    fn from(keyboard: Keyboard) -> Self {
        let layout = match keyboard.layout {
            KeyboardLayout::Unknown => pb::KeyboardLayout::Unknown,
            KeyboardLayout::Qwerty => pb::KeyboardLayout::Qwerty,
            KeyboardLayout::Qwertz => pb::KeyboardLayout::Qwertz,
            KeyboardLayout::Azerty => pb::KeyboardLayout::Azerty,
        };
        Self {
            layout: layout as i32,
            backlit: keyboard.backlit,
        }
    }
}

impl TryFrom<pb::Keyboard> for Keyboard {
    type Error = Status;

    fn try_from(keyboard: pb::Keyboard) -> Result<Self, Status> {
        let layout = match known(keyboard.layout, "keyboard layout")? {
            pb::KeyboardLayout::Unknown => KeyboardLayout::Unknown,
            pb::KeyboardLayout::Qwerty => KeyboardLayout::Qwerty,
            pb::KeyboardLayout::Qwertz => KeyboardLayout::Qwertz,
            pb::KeyboardLayout::Azerty => KeyboardLayout::Azerty,
        };
        Ok(Self {
            layout,
            backlit: keyboard.backlit,
        })
    }
}

// =============================================================================
// Laptop
// =============================================================================

fn timestamp(at: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: at.timestamp(),
        nanos: i32::try_from(at.timestamp_subsec_nanos()).unwrap_or(999_999_999),
    }
}

fn date_time(at: Timestamp) -> Result<DateTime<Utc>, Status> {
    u32::try_from(at.nanos)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(at.seconds, nanos))
        .ok_or_else(|| Status::invalid_argument("updated_at is out of range"))
}

impl From<Laptop> for pb::Laptop {
    fn from(laptop: Laptop) -> Self {
        let weight = match laptop.weight {
            Weight::Kg(kg) => pb::laptop::Weight::WeightKg(kg),
            Weight::Lb(lb) => pb::laptop::Weight::WeightLb(lb),
        };
        Self {
            id: laptop.id,
            brand: laptop.brand,
            name: laptop.name,
            cpu: Some(laptop.cpu.into()),
            ram: Some(laptop.ram.into()),
            gpus: laptop.gpus.into_iter().map(Into::into).collect(),
            storages: laptop.storages.into_iter().map(Into::into).collect(),
            screen: Some(laptop.screen.into()),
            keyboard: Some(laptop.keyboard.into()),
            weight: Some(weight),
            price_usd: laptop.price_usd,
            release_year: laptop.release_year,
            updated_at: Some(timestamp(laptop.updated_at)),
        }
    }
}

impl TryFrom<pb::Laptop> for Laptop {
    type Error = Status;

    fn try_from(laptop: pb::Laptop) -> Result<Self, Status> {
        let weight = match required(laptop.weight, "weight")? {
            pb::laptop::Weight::WeightKg(kg) => Weight::Kg(kg),
            pb::laptop::Weight::WeightLb(lb) => Weight::Lb(lb),
        };
        Ok(Self {
            id: laptop.id,
            brand: laptop.brand,
            name: laptop.name,
            cpu: required(laptop.cpu, "cpu")?.into(),
            ram: memory(laptop.ram, "ram")?,
            gpus: laptop
                .gpus
                .into_iter()
                .map(Gpu::try_from)
                .collect::<Result<_, _>>()?,
            storages: laptop
                .storages
                .into_iter()
                .map(Storage::try_from)
                .collect::<Result<_, _>>()?,
            screen: Screen::try_from(required(laptop.screen, "screen")?)?,
            keyboard: Keyboard::try_from(required(laptop.keyboard, "keyboard")?)?,
            weight,
            price_usd: laptop.price_usd,
            release_year: laptop.release_year,
            updated_at: date_time(required(laptop.updated_at, "updated_at")?)?,
        })
    }
}

// =============================================================================
// Filter
// =============================================================================

impl From<Filter> for pb::Filter {
    fn from(filter: Filter) -> Self {
        Self {
            max_price_usd: filter.max_price_usd,
            min_cpu_cores: filter.min_cpu_cores,
            min_cpu_ghz: filter.min_cpu_ghz,
            min_ram: filter.min_ram.map(Into::into),
        }
    }
}

impl TryFrom<pb::Filter> for Filter {
    type Error = Status;

    fn try_from(filter: pb::Filter) -> Result<Self, Status> {
        Ok(Self {
            max_price_usd: filter.max_price_usd,
            min_cpu_cores: filter.min_cpu_cores,
            min_cpu_ghz: filter.min_cpu_ghz,
            min_ram: filter.min_ram.map(Memory::try_from).transpose()?,
        })
    }
}
