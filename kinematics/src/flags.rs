use num_traits::{One, PrimInt};

/// Implemented by enums whose variants name single bits of a mask.
///
/// The discriminant (`#[repr(u8)]`) is the bit index; `Storage` picks the
/// integer the mask lives in.
pub trait FlagBit {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        // bit_index() must stay below the bit width of Storage.
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// Plain bit set over a primitive integer, used for diagnostic masks.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlagSet<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> FlagSet<T> {
    pub fn new(bits: T) -> Self {
        Self { bits }
    }

    pub fn add<U: FlagBit<Storage = T>>(&mut self, flag: U) {
        self.bits = self.bits | flag.mask();
    }

    pub fn remove<U: FlagBit<Storage = T>>(&mut self, flag: U) {
        self.bits = self.bits & !flag.mask();
    }

    pub fn has<U: FlagBit<Storage = T>>(&self, flag: U) -> bool {
        (self.bits & flag.mask()) != T::zero()
    }

    pub fn has_any<U: FlagBit<Storage = T> + Copy>(&self, flags: &[U]) -> bool {
        let combined = flags.iter().fold(T::zero(), |acc, f| acc | f.mask());
        (self.bits & combined) != T::zero()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == T::zero()
    }

    pub fn clear(&mut self) {
        self.bits = T::zero();
    }

    /// Iterate the set flags of `all` in declaration order.
    pub fn iter_set<'a, U: FlagBit<Storage = T> + Copy>(&'a self, all: &'a [U]) -> impl Iterator<Item = U> + 'a {
        all.iter().copied().filter(move |f| self.has(*f))
    }
}

/// Declare a flag enum, implement [`FlagBit`] for it and list its variants in `ALL`.
///
/// ```
/// kinematics::define_flags!(Probe, u8, { Near, Far });
/// let mut set = kinematics::flags::FlagSet::<u8>::default();
/// set.add(Probe::Far);
/// assert!(set.has(Probe::Far) && !set.has(Probe::Near));
/// ```
#[macro_export]
macro_rules! define_flags {
    ($name:ident, $storage:ty, { $($(#[$meta:meta])* $variant:ident),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$meta])* $variant),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];
        }

        impl $crate::flags::FlagBit for $name {
            type Storage = $storage;

            fn bit_index(&self) -> u8 {
                *self as u8
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::define_flags!(Sample, u16, { A, B, C });

    #[test]
    fn add_remove_and_iterate() {
        let mut set = FlagSet::<u16>::default();
        assert!(set.is_empty());
        set.add(Sample::A);
        set.add(Sample::C);
        assert_eq!(set.bits, 0b101);
        assert!(set.has_any(&[Sample::B, Sample::C]));
        assert_eq!(set.iter_set(Sample::ALL).collect::<Vec<_>>(), vec![Sample::A, Sample::C]);
        set.remove(Sample::A);
        assert!(!set.has(Sample::A));
        set.clear();
        assert!(set.is_empty());
    }
}
