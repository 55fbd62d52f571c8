// Free functions returning the bytes of fixed header fields.
macro_rules! header_field_range_accessors {
    ( $(($get_range: ident, $get_range_mut: ident, $left: literal..$right: literal $(,)?)),* $(,)? )
    => {
        $(
            #[inline]
            fn $get_range(buf: &[u8]) -> &[u8] {
                &buf[$left..$right]
            }
        )*

        $(
            #[inline]
            fn $get_range_mut(buf: &mut [u8]) -> &mut [u8] {
                &mut buf[$left..$right]
            }
        )*
    }
}

macro_rules! header_field_val_accessors {
    ( $(($get_val: ident, $get_val_mut: ident, $val: literal $(,)?)),* $(,)? )
    => {
        $(
            #[inline]
            fn $get_val(buf: &[u8]) -> &u8 {
                &buf[$val]
            }
        )*

        $(
            #[inline]
            fn $get_val_mut(buf: &mut [u8]) -> &mut u8 {
                &mut buf[$val]
            }
        )*
    }
}

macro_rules! enum_sim {
    (
        $(#[$enum_attr: meta])*
        pub struct $tname:ident ($size_t:ty) {
            $(
                $(#[$arm_attr: meta])*
                $enum_arm:ident = $num_exp:expr
            ),+ $(,)?
        }
    ) => {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
        $(#[$enum_attr])*
        pub struct $tname($size_t);

        impl $tname {
            $(
                $(#[$arm_attr])*
                pub const $enum_arm: Self = Self($num_exp);
            )+

            /// Get the raw value.
            pub const fn raw(&self) -> $size_t {
                self.0
            }
        }

        impl ::core::convert::From<$size_t> for $tname {
            #[inline]
            fn from(value: $size_t) -> $tname {
                $tname(value)
            }
        }

        impl ::core::convert::From<$tname> for $size_t {
            #[inline]
            fn from(value: $tname) -> $size_t {
                value.0
            }
        }
    };
}

// Expands inside an `impl Pdu for X` block. `X` must be `Clone` and keep its
// successor in a field named `inner`.
macro_rules! pdu_common {
    () => {
        #[inline]
        fn inner_slot(&self) -> &Option<Box<dyn $crate::pdu::Pdu>> {
            &self.inner
        }

        #[inline]
        fn inner_slot_mut(&mut self) -> &mut Option<Box<dyn $crate::pdu::Pdu>> {
            &mut self.inner
        }

        fn clone_pdu(&self) -> Box<dyn $crate::pdu::Pdu> {
            Box::new(self.clone())
        }

        #[inline]
        fn as_any(&self) -> &dyn ::core::any::Any {
            self
        }

        #[inline]
        fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
            self
        }
    };
}

// `outer / inner` and `outer /= inner` for the listed PDU types.
macro_rules! impl_stacking {
    ($($pdu:ty),+ $(,)?) => {
        $(
            impl<P: $crate::pdu::Pdu> ::core::ops::Div<P> for $pdu {
                type Output = $pdu;

                #[inline]
                fn div(mut self, rhs: P) -> $pdu {
                    $crate::pdu::Pdu::append_pdu(&mut self, Box::new(rhs));
                    self
                }
            }

            impl<P: $crate::pdu::Pdu> ::core::ops::DivAssign<P> for $pdu {
                #[inline]
                fn div_assign(&mut self, rhs: P) {
                    $crate::pdu::Pdu::append_pdu(self, Box::new(rhs));
                }
            }
        )+
    };
}
