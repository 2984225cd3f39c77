use core::fmt::{Debug, Display};
use core::iter::Sum;
use core::ops::{AddAssign, SubAssign};

use num_traits::Float;

/// A trait representing an edge capacity type which is typically a float.
pub trait Weight:
    Float
    + AddAssign
    + SubAssign
    + Sum<Self>
    + Debug
    + Display
    + Default
{
}

impl Weight for f32 {}

impl Weight for f64 {}
