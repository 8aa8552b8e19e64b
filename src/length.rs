use std::collections::VecDeque;

/// Values with a length that handles forward as `length()`.
pub trait Length
{
    fn length(&self) -> usize;
}

impl Length for str
{
    fn length(&self) -> usize { self.len() }
}

impl Length for String
{
    fn length(&self) -> usize { self.len() }
}

impl<T> Length for [T]
{
    fn length(&self) -> usize { self.len() }
}

impl<T, const N: usize> Length for [T; N]
{
    fn length(&self) -> usize { N }
}

impl<T> Length for Vec<T>
{
    fn length(&self) -> usize { self.len() }
}

impl<T> Length for VecDeque<T>
{
    fn length(&self) -> usize { self.len() }
}
