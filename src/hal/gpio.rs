//! GPIO HAL for the bell input.
//!
//! The interrupt fires on both edges, reads the pin, timestamps the
//! transition and pushes it to the [`EdgeQueue`]. Nothing else runs in
//! interrupt context.

use crate::edge::Polarity;
use crate::queue::RawEdge;

#[cfg(target_os = "espidf")]
use crate::queue::EdgeQueue;
#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{self as esp_idf_sys, esp, EspError};

/// Bell input pin configuration.
pub struct BellInputConfig {
    pub pin: i32,
    pub polarity: Polarity,
    /// Enable the internal pull-up (open-collector bell outputs).
    pub pull_up: bool,
}

impl Default for BellInputConfig {
    fn default() -> Self {
        Self {
            pin: 4,
            polarity: Polarity::ActiveLow,
            pull_up: true,
        }
    }
}

/// Build the queued transition from a pin read.
#[inline]
pub fn raw_edge(pin_high: bool, polarity: Polarity, now_us: i64) -> RawEdge {
    RawEdge {
        timestamp_ms: now_us / 1000,
        active: polarity.level(pin_high).is_active(),
    }
}

#[cfg(target_os = "espidf")]
static BELL_PIN: AtomicI32 = AtomicI32::new(-1);
#[cfg(target_os = "espidf")]
static BELL_ACTIVE_LOW: AtomicBool = AtomicBool::new(true);

#[cfg(target_os = "espidf")]
extern "C" fn bell_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static EdgeQueue` registered in install_bell_isr.
    let queue = unsafe { &*(arg as *const EdgeQueue) };
    let pin = BELL_PIN.load(Ordering::Relaxed);
    let polarity = if BELL_ACTIVE_LOW.load(Ordering::Relaxed) {
        Polarity::ActiveLow
    } else {
        Polarity::ActiveHigh
    };

    // SAFETY: Both calls are ISR-safe ESP-IDF functions.
    let (pin_high, now_us) = unsafe {
        (
            esp_idf_sys::gpio_get_level(pin) != 0,
            esp_idf_sys::esp_timer_get_time(),
        )
    };
    queue.push(raw_edge(pin_high, polarity, now_us));
}

/// Configure the bell pin and start feeding `queue` from its interrupt.
///
/// Call once at startup.
#[cfg(target_os = "espidf")]
pub fn install_bell_isr(
    config: &BellInputConfig,
    queue: &'static EdgeQueue,
) -> Result<(), EspError> {
    BELL_PIN.store(config.pin, Ordering::Relaxed);
    BELL_ACTIVE_LOW.store(config.polarity == Polarity::ActiveLow, Ordering::Relaxed);

    let io = esp_idf_sys::gpio_config_t {
        pin_bit_mask: 1u64 << config.pin,
        mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: if config.pull_up {
            esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_ANYEDGE,
        ..Default::default()
    };

    // SAFETY: Plain ESP-IDF driver calls; the handler argument is 'static.
    unsafe {
        esp!(esp_idf_sys::gpio_config(&io))?;

        // Already installed by another driver is fine
        let err = esp_idf_sys::gpio_install_isr_service(0);
        if err != esp_idf_sys::ESP_ERR_INVALID_STATE as esp_idf_sys::esp_err_t {
            esp!(err)?;
        }

        esp!(esp_idf_sys::gpio_isr_handler_add(
            config.pin,
            Some(bell_isr),
            queue as *const EdgeQueue as *mut core::ffi::c_void,
        ))?;
    }

    Ok(())
}
