use crate::{NumBytes, Read, ReadError, Write, WriteError};

macro_rules! impl_fixed_int {
    ($($ty:ty),*) => {
        $(
            impl NumBytes for $ty {
                #[inline(always)]
                fn num_bytes(&self) -> usize {
                    core::mem::size_of::<$ty>()
                }
            }

            impl Read for $ty {
                #[inline(always)]
                fn read(bytes: &[u8], pos: &mut usize) -> Result<Self, ReadError> {
                    const SIZE: usize = core::mem::size_of::<$ty>();
                    let end = pos.checked_add(SIZE).ok_or(ReadError::NotEnoughBytes)?;
                    let slice = bytes.get(*pos..end).ok_or(ReadError::NotEnoughBytes)?;
                    let mut arr = [0u8; SIZE];
                    arr.copy_from_slice(slice);
                    *pos = end;
                    Ok(<$ty>::from_le_bytes(arr))
                }
            }

            impl Write for $ty {
                #[inline(always)]
                fn write(&self, bytes: &mut [u8], pos: &mut usize) -> Result<(), WriteError> {
                    const SIZE: usize = core::mem::size_of::<$ty>();
                    let end = pos.checked_add(SIZE).ok_or(WriteError::NotEnoughSpace)?;
                    let slice = bytes.get_mut(*pos..end).ok_or(WriteError::NotEnoughSpace)?;
                    slice.copy_from_slice(&self.to_le_bytes());
                    *pos = end;
                    Ok(())
                }
            }
        )*
    };
}

impl_fixed_int!(u8, i8, u16, i16, u32, i32, u64, i64, u128);

impl NumBytes for bool {
    #[inline(always)]
    fn num_bytes(&self) -> usize {
        core::mem::size_of::<u8>()
    }
}

impl Read for bool {
    #[inline(always)]
    fn read(bytes: &[u8], pos: &mut usize) -> Result<Self, ReadError> {
        match u8::read(bytes, pos)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReadError::ParseError),
        }
    }
}

impl Write for bool {
    #[inline(always)]
    fn write(&self, bytes: &mut [u8], pos: &mut usize) -> Result<(), WriteError> {
        (*self as u8).write(bytes, pos)
    }
}

impl<T: NumBytes> NumBytes for Option<T> {
    #[inline(always)]
    fn num_bytes(&self) -> usize {
        match self {
            Some(value) => 1 + value.num_bytes(),
            None => 1,
        }
    }
}

impl<T: Read> Read for Option<T> {
    #[inline]
    fn read(bytes: &[u8], pos: &mut usize) -> Result<Self, ReadError> {
        if bool::read(bytes, pos)? {
            Ok(Some(T::read(bytes, pos)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Write> Write for Option<T> {
    #[inline]
    fn write(&self, bytes: &mut [u8], pos: &mut usize) -> Result<(), WriteError> {
        match self {
            Some(value) => {
                true.write(bytes, pos)?;
                value.write(bytes, pos)
            }
            None => false.write(bytes, pos),
        }
    }
}

// Sequences carry a u32 element count.
impl<T: NumBytes> NumBytes for Vec<T> {
    #[inline]
    fn num_bytes(&self) -> usize {
        self.iter()
            .fold(core::mem::size_of::<u32>(), |count, item| count + item.num_bytes())
    }
}

impl<T: Read> Read for Vec<T> {
    #[inline]
    fn read(bytes: &[u8], pos: &mut usize) -> Result<Self, ReadError> {
        let len = u32::read(bytes, pos)? as usize;
        if len > bytes.len().saturating_sub(*pos) {
            return Err(ReadError::NotEnoughBytes);
        }
        let mut vec = Vec::with_capacity(len);
        for _ in 0..len {
            vec.push(T::read(bytes, pos)?);
        }
        Ok(vec)
    }
}

impl<T: Write> Write for Vec<T> {
    #[inline]
    fn write(&self, bytes: &mut [u8], pos: &mut usize) -> Result<(), WriteError> {
        let len = u32::try_from(self.len()).map_err(|_| WriteError::TryFromIntError)?;
        len.write(bytes, pos)?;
        for item in self {
            item.write(bytes, pos)?;
        }
        Ok(())
    }
}
