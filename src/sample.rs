//! Random laptop generator for demos and tests.

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{
    Cpu, Gpu, Keyboard, KeyboardLayout, Laptop, Memory, MemoryUnit, Panel, Resolution, Screen,
    Storage, StorageDriver, Weight,
};

/// Generates a random laptop with a fresh UUID.
pub fn new_laptop() -> Laptop {
    let mut rng = rand::thread_rng();
    let brand = pick(&["Apple", "Dell", "Lenovo"]);
    let name = match brand {
        "Apple" => pick(&["Macbook Air", "Macbook Pro"]),
        "Dell" => pick(&["Latitude", "Vostro", "XPS"]),
        _ => pick(&["Thinkpad X1", "Thinkpad P1"]),
    };

    Laptop {
        id: uuid::Uuid::new_v4().to_string(),
        brand: brand.to_string(),
        name: name.to_string(),
        cpu: new_cpu(),
        ram: Memory::new(rng.gen_range(4..=64), MemoryUnit::Gigabyte),
        gpus: vec![new_gpu()],
        storages: vec![new_ssd(), new_hdd()],
        screen: new_screen(),
        keyboard: new_keyboard(),
        weight: Weight::Kg(rng.gen_range(1.0..3.0)),
        price_usd: rng.gen_range(1500.0..3500.0),
        release_year: rng.gen_range(2015..=2024),
        updated_at: Utc::now(),
    }
}

/// Random score in `1..=10`.
pub fn random_laptop_score() -> f64 {
    f64::from(rand::thread_rng().gen_range(1u32..=10))
}

fn new_cpu() -> Cpu {
    let mut rng = rand::thread_rng();
    let brand = pick(&["Intel", "AMD"]);
    let name = if brand == "Intel" {
        pick(&["Core i3", "Core i5", "Core i7"])
    } else {
        pick(&["Ryzen 3", "Ryzen 5", "Ryzen 7"])
    };

    let number_cores = rng.gen_range(2..=8);
    let number_threads = rng.gen_range(number_cores..=12);
    let min_ghz = rng.gen_range(2.0..3.5);
    let max_ghz = rng.gen_range(min_ghz..5.0);

    Cpu {
        brand: brand.to_string(),
        name: name.to_string(),
        number_cores,
        number_threads,
        min_ghz,
        max_ghz,
    }
}

fn new_gpu() -> Gpu {
    let mut rng = rand::thread_rng();
    let brand = pick(&["Nvidia", "AMD"]);
    let name = if brand == "Nvidia" {
        pick(&["GTX 1060", "GTX 1070", "GTX 1080"])
    } else {
        pick(&["RX 570", "RX 580", "RX 590"])
    };
    let min_ghz = rng.gen_range(1.0..1.5);

    Gpu {
        brand: brand.to_string(),
        name: name.to_string(),
        min_ghz,
        max_ghz: rng.gen_range(min_ghz..2.0),
        memory: Memory::new(rng.gen_range(2..=8), MemoryUnit::Gigabyte),
    }
}

fn new_ssd() -> Storage {
    Storage {
        driver: StorageDriver::Ssd,
        memory: Memory::new(rand::thread_rng().gen_range(128..=1024), MemoryUnit::Gigabyte),
    }
}

fn new_hdd() -> Storage {
    Storage {
        driver: StorageDriver::Hdd,
        memory: Memory::new(rand::thread_rng().gen_range(1..=6), MemoryUnit::Terabyte),
    }
}

fn new_screen() -> Screen {
    let mut rng = rand::thread_rng();
    let height = rng.gen_range(1080..=4320);

    Screen {
        size_inch: rng.gen_range(13.0..17.0),
        resolution: Resolution {
            width: height * 16 / 9,
            height,
        },
        panel: *[Panel::Unknown, Panel::Ips, Panel::Oled]
            .choose(&mut rng)
            .unwrap_or(&Panel::Unknown),
        multitouch: rng.gen_bool(0.5),
    }
}

fn new_keyboard() -> Keyboard {
    let mut rng = rand::thread_rng();
    Keyboard {
        layout: *[
            KeyboardLayout::Qwerty,
            KeyboardLayout::Qwertz,
            KeyboardLayout::Azerty,
        ]
        .choose(&mut rng)
        .unwrap_or(&KeyboardLayout::Unknown),
        backlit: rng.gen_bool(0.5),
    }
}

fn pick(set: &[&'static str]) -> &'static str {
    set.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_laptop_has_valid_id() {
        let laptop = new_laptop();
        assert!(uuid::Uuid::parse_str(&laptop.id).is_ok());
        assert!(laptop.cpu.number_threads >= laptop.cpu.number_cores);
        assert!(laptop.cpu.max_ghz >= laptop.cpu.min_ghz);
    }

    #[test]
    fn test_score_range() {
        for _ in 0..100 {
            let score = random_laptop_score();
            assert!((1.0..=10.0).contains(&score));
        }
    }
}
