#![forbid(unsafe_code)]

//! Change detection for cell values.
//!
//! A `set` only notifies when the new value is *observably different* from
//! the stored one. Scalars compare by value, with two NaNs counting as the
//! same value. Composite values (structs, collections) use the default
//! method and are always considered different, so a value that was mutated
//! in place and written back still notifies.

/// The "observably different" test used by [`Observable::set`].
///
/// Implement it with an empty body for composite state types:
///
/// ```
/// use cartkit_runtime::reactive::SafeEq;
///
/// #[derive(Clone)]
/// struct Basket {
///     lines: Vec<u32>,
/// }
///
/// impl SafeEq for Basket {}
/// ```
///
/// [`Observable::set`]: super::Observable::set
pub trait SafeEq {
    /// Whether `other` is indistinguishable from `self`.
    ///
    /// Defaults to `false`: every write of a composite value is a change.
    fn same_as(&self, _other: &Self) -> bool {
        false
    }
}

/// Inverse of [`SafeEq::same_as`].
#[inline]
#[must_use]
pub fn safe_not_equal<T: SafeEq + ?Sized>(a: &T, b: &T) -> bool {
    !a.same_as(b)
}

macro_rules! impl_by_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl SafeEq for $t {
                #[inline]
                fn same_as(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_by_value!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, (), String,
    &'static str,
);

macro_rules! impl_nan_safe {
    ($($t:ty),*) => {
        $(
            impl SafeEq for $t {
                #[inline]
                fn same_as(&self, other: &Self) -> bool {
                    self == other || (self.is_nan() && other.is_nan())
                }
            }
        )*
    };
}

impl_nan_safe!(f32, f64);

impl<T: SafeEq> SafeEq for Option<T> {
    fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_as(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> SafeEq for Vec<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_compare_by_value() {
        assert!(3i64.same_as(&3));
        assert!(safe_not_equal(&3i64, &4));
    }

    #[test]
    fn nan_equals_nan() {
        assert!(f64::NAN.same_as(&f64::NAN));
        assert!(f32::NAN.same_as(&f32::NAN));
        assert!(safe_not_equal(&f64::NAN, &0.0));
    }

    #[test]
    fn signed_zeroes_are_the_same() {
        assert!(0.0f64.same_as(&-0.0));
    }

    #[test]
    fn strings_compare_by_value() {
        assert!("a".to_string().same_as(&"a".to_string()));
        assert!(safe_not_equal(&"a", &"b"));
    }

    #[test]
    fn option_delegates_to_inner() {
        assert!(Some(f64::NAN).same_as(&Some(f64::NAN)));
        assert!(None::<i32>.same_as(&None));
        assert!(safe_not_equal(&Some(1), &None));
    }

    #[test]
    fn collections_are_always_different() {
        let v = vec![1, 2, 3];
        assert!(safe_not_equal(&v, &v.clone()));
        assert!(safe_not_equal(&v, &v));
    }

    #[test]
    fn composite_default_is_always_different() {
        struct Marker;
        impl SafeEq for Marker {}
        assert!(safe_not_equal(&Marker, &Marker));
    }
}
