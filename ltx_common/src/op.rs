/// Implements arithmetic operator traits for newtypes over a numeric primitive, so that [`crate::Money`] does not
/// need a page of identical `impl` blocks. The trait and its method must be in scope at the call site.
#[macro_export]
macro_rules! op {
    // Self-to-self binary operators, e.g. `op!(pairwise Money: Add::add, Sub::sub);`
    (pairwise $t:ident: $($trait:ident::$method:ident),+ $(,)?) => {
        $(
            impl $trait for $t {
                type Output = Self;

                fn $method(self, rhs: Self) -> Self {
                    Self(self.0.$method(rhs.0))
                }
            }
        )+
    };

    // In-place assignment operators
    (assign $t:ident: $($trait:ident::$method:ident),+ $(,)?) => {
        $(
            impl $trait for $t {
                fn $method(&mut self, rhs: Self) {
                    self.0.$method(rhs.0)
                }
            }
        )+
    };

    // Operators whose right-hand side is the bare primitive, e.g. scaling by a quantity
    (scalar $t:ident, $rhs:ty: $($trait:ident::$method:ident),+ $(,)?) => {
        $(
            impl $trait<$rhs> for $t {
                type Output = Self;

                fn $method(self, rhs: $rhs) -> Self {
                    Self(self.0.$method(rhs))
                }
            }
        )+
    };

    (negate $t:ident) => {
        impl Neg for $t {
            type Output = Self;

            fn neg(self) -> Self {
                Self(self.0.neg())
            }
        }
    };
}
