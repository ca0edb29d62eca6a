//! Device identification.

use std::fmt;

/// Identification fields read from a device descriptor.
///
/// These are the same fields a [`MatchFilter`](crate::MatchFilter) matches
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIds {
    /// USB vendor ID (`idVendor`).
    pub vendor_id: u16,
    /// USB product ID (`idProduct`).
    pub product_id: u16,
    /// Device class code (`bDeviceClass`).
    pub class_code: u8,
}

impl DeviceIds {
    /// Create device IDs from descriptor fields.
    pub fn new(vendor_id: u16, product_id: u16, class_code: u8) -> Self {
        Self { vendor_id, product_id, class_code }
    }
}

impl fmt::Display for DeviceIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_zero_padded_lowercase_hex() {
        let ids = DeviceIds::new(0x46d, 0xC52B, 0);
        assert_eq!(ids.to_string(), "046d:c52b");
    }

    #[test]
    fn display_omits_class_code() {
        let ids = DeviceIds::new(0x1d6b, 0x0002, 9);
        assert_eq!(ids.to_string(), "1d6b:0002");
    }
}
