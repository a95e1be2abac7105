//! Macro for the closed, index-addressable enums used across the crate.

/// Generate a fieldless enum with stable raw codes and upper-case labels.
///
/// Variants are numbered in declaration order starting at the given code
/// base. A base of `1` reserves code `0` as the "none" sentinel that the
/// raw-input entry points reject.
///
/// The generated type carries:
/// - `ALL` and `COUNT` for table sizing
/// - `index()` (zero based, for array addressing)
/// - `code()` / `from_code()` for raw, bounds-checked conversion
/// - `name()` and a matching `Display` impl
///
/// # Example
///
/// ```ignore
/// fixed_enum! {
///     pub enum Phase: 0 {
///         Warmup => "WARMUP",
///         Run => "RUN",
///     }
/// }
///
/// assert_eq!(Phase::COUNT, 2);
/// assert_eq!(Phase::from_code(1), Some(Phase::Run));
/// assert_eq!(Phase::Run.name(), "RUN");
/// ```
macro_rules! fixed_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $base:literal {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $label:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        #[repr(u8)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every variant, in code order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Number of variants (the sentinel "count" value).
            pub const COUNT: usize = Self::ALL.len();

            const CODE_BASE: u8 = $base;

            /// Zero-based position, suitable for indexing fixed tables.
            #[inline]
            pub const fn index(self) -> usize {
                self as usize
            }

            /// Raw wire/ISR code.
            #[inline]
            pub const fn code(self) -> u8 {
                self as u8 + Self::CODE_BASE
            }

            /// Decode a raw code, rejecting sentinels and out-of-range values.
            pub fn from_code(code: u8) -> Option<Self> {
                let index = code.checked_sub(Self::CODE_BASE)?;
                Self::ALL.get(usize::from(index)).copied()
            }

            /// Upper-case label used in traces.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),*
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub(crate) use fixed_enum;
