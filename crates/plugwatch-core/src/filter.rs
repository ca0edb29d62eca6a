//! Hotplug match filters.
//!
//! A filter restricts which devices trigger the hotplug callbacks. Each field
//! is either a concrete value or "any", the same wildcard libusb expresses as
//! `LIBUSB_HOTPLUG_MATCH_ANY` (numerically `-1`).
//!
//! # Argument syntax
//!
//! Numbers follow the C `strtol` base-0 conventions used by the classic
//! libusb tools:
//!
//! - `0x046d` / `0X46D`: hexadecimal
//! - `0755`: octal (leading zero)
//! - `1133`: decimal
//! - `-1` or `any`: match any value
//!
//! Unlike `strtol`, trailing garbage is rejected instead of ignored.

use std::fmt;

use crate::{device::DeviceIds, error::FilterError};

/// Numeric value libusb uses for "match any".
pub const MATCH_ANY: i64 = -1;

/// Vendor/product/class filter for hotplug registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchFilter {
    /// Vendor ID to match, `None` for any.
    pub vendor_id: Option<u16>,
    /// Product ID to match, `None` for any.
    pub product_id: Option<u16>,
    /// Device class to match, `None` for any.
    pub class_code: Option<u8>,
}

impl MatchFilter {
    /// Filter matching every device.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to a vendor ID.
    #[must_use]
    pub fn with_vendor_id(mut self, vendor_id: u16) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    /// Restrict to a product ID.
    #[must_use]
    pub fn with_product_id(mut self, product_id: u16) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// Restrict to a device class.
    #[must_use]
    pub fn with_class_code(mut self, class_code: u8) -> Self {
        self.class_code = Some(class_code);
        self
    }

    /// Build a filter from positional arguments: vendor, product, class.
    ///
    /// Missing arguments match any value. Arguments past the third are
    /// ignored.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, FilterError> {
        let mut filter = Self::any();

        if let Some(arg) = args.first() {
            filter.vendor_id = parse_vendor_id(arg.as_ref())?;
        }
        if let Some(arg) = args.get(1) {
            filter.product_id = parse_product_id(arg.as_ref())?;
        }
        if let Some(arg) = args.get(2) {
            filter.class_code = parse_class_code(arg.as_ref())?;
        }

        Ok(filter)
    }

    /// Whether every field is a wildcard.
    pub fn is_any(&self) -> bool {
        self.vendor_id.is_none() && self.product_id.is_none() && self.class_code.is_none()
    }

    /// Check a device against the filter.
    pub fn matches(&self, ids: &DeviceIds) -> bool {
        self.vendor_id.is_none_or(|v| v == ids.vendor_id)
            && self.product_id.is_none_or(|p| p == ids.product_id)
            && self.class_code.is_none_or(|c| c == ids.class_code)
    }
}

impl fmt::Display for MatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vendor_id {
            Some(v) => write!(f, "vendor={v:04x}")?,
            None => f.write_str("vendor=any")?,
        }
        match self.product_id {
            Some(p) => write!(f, " product={p:04x}")?,
            None => f.write_str(" product=any")?,
        }
        match self.class_code {
            Some(c) => write!(f, " class={c:02x}"),
            None => f.write_str(" class=any"),
        }
    }
}

/// Parse a vendor ID argument.
pub fn parse_vendor_id(input: &str) -> Result<Option<u16>, FilterError> {
    parse_narrowed(input, "vendor ID", u32::from(u16::MAX))
}

/// Parse a product ID argument.
pub fn parse_product_id(input: &str) -> Result<Option<u16>, FilterError> {
    parse_narrowed(input, "product ID", u32::from(u16::MAX))
}

/// Parse a device class argument.
pub fn parse_class_code(input: &str) -> Result<Option<u8>, FilterError> {
    parse_narrowed(input, "class", u32::from(u8::MAX))
}

/// Parse one filter field, range-checked to `max`. `Ok(None)` means any.
pub fn parse_id(input: &str, field: &'static str, max: u32) -> Result<Option<u32>, FilterError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FilterError::Empty { field });
    }
    if trimmed.eq_ignore_ascii_case("any") {
        return Ok(None);
    }

    let value = parse_number(trimmed)
        .ok_or_else(|| FilterError::Malformed { field, input: input.to_string() })?;

    if value == MATCH_ANY {
        return Ok(None);
    }

    match u32::try_from(value) {
        Ok(v) if v <= max => Ok(Some(v)),
        _ => Err(FilterError::OutOfRange { field, value, max }),
    }
}

/// [`parse_id`] converted to the field's integer type.
fn parse_narrowed<T: TryFrom<u32>>(
    input: &str,
    field: &'static str,
    max: u32,
) -> Result<Option<T>, FilterError> {
    parse_id(input, field, max)?
        .map(|v| {
            T::try_from(v).map_err(|_| FilterError::OutOfRange { field, value: i64::from(v), max })
        })
        .transpose()
}

/// Base-0 integer parsing: sign, then `0x` hex, `0` octal or decimal.
fn parse_number(text: &str) -> Option<i64> {
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (digits, radix) = if let Some(hex) =
        unsigned.strip_prefix("0x").or_else(|| unsigned.strip_prefix("0X"))
    {
        (hex, 16)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (&unsigned[1..], 8)
    } else {
        (unsigned, 10)
    };

    // from_str_radix would accept a second sign here
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
