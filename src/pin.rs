use core::marker::PhantomData;

use crate::GpioChip;

/// Representation of a port-expander pin.
///
/// `Pin` is not constructed directly, this type is created by instantiating a port-expander and
/// then getting access to all its pins using the `.split()` method.
pub struct Pin<'a, MODE, C> {
    pin: u8,
    chip: &'a C,
    _m: PhantomData<MODE>,
}

impl<'a, MODE, C> Pin<'a, MODE, C>
where
    C: GpioChip,
{
    pub(crate) fn new(pin: u8, chip: &'a C) -> Self {
        debug_assert!(pin < 16);
        Self {
            pin,
            chip,
            _m: PhantomData,
        }
    }

    /// Offset of the pin on its chip.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// The chip this pin belongs to.
    pub fn chip(&self) -> &'a C {
        self.chip
    }
}

impl<'a, MODE, C> Pin<'a, MODE, C>
where
    MODE: crate::mode::HasInput,
    C: GpioChip,
{
    /// Read the pin's input state and return `true` if it is HIGH.
    pub fn is_high(&self) -> Result<bool, C::Error> {
        self.chip.get(self.pin)
    }

    /// Read the pin's input state and return `true` if it is LOW.
    pub fn is_low(&self) -> Result<bool, C::Error> {
        Ok(!self.is_high()?)
    }
}

impl<'a, C: GpioChip> Pin<'a, crate::mode::Input, C> {
    /// Configure this pin as an output with an initial LOW state.
    ///
    /// The LOW state is, as long as this function is executed correctly, guaranteed to be
    /// applied before the pin is configured as an output.
    pub fn into_output(self) -> Result<Pin<'a, crate::mode::Output, C>, C::Error> {
        self.chip.direction_output(self.pin, false)?;
        Ok(Pin {
            pin: self.pin,
            chip: self.chip,
            _m: PhantomData,
        })
    }

    /// Configure this pin as an output with an initial HIGH state.
    ///
    /// The HIGH state is, as long as this function is executed correctly, guaranteed to be
    /// applied before the pin is configured as an output.
    pub fn into_output_high(self) -> Result<Pin<'a, crate::mode::Output, C>, C::Error> {
        self.chip.direction_output(self.pin, true)?;
        Ok(Pin {
            pin: self.pin,
            chip: self.chip,
            _m: PhantomData,
        })
    }
}

impl<'a, C: GpioChip> Pin<'a, crate::mode::Output, C> {
    /// Configure this pin as an input.
    pub fn into_input(self) -> Result<Pin<'a, crate::mode::Input, C>, C::Error> {
        self.chip.direction_input(self.pin)?;
        Ok(Pin {
            pin: self.pin,
            chip: self.chip,
            _m: PhantomData,
        })
    }
}

impl<'a, MODE, C> Pin<'a, MODE, C>
where
    MODE: crate::mode::HasOutput,
    C: GpioChip,
{
    /// Set the pin's output state to HIGH.
    ///
    /// Note that this can have different electrical meanings depending on the port-expander
    /// chip.
    pub fn set_high(&mut self) -> Result<(), C::Error> {
        self.chip.set(self.pin, true)
    }

    /// Set the pin's output state to LOW.
    ///
    /// Note that this can have different electrical meanings depending on the port-expander
    /// chip.
    pub fn set_low(&mut self) -> Result<(), C::Error> {
        self.chip.set(self.pin, false)
    }

    /// Return `true` if the pin's output state is HIGH.
    ///
    /// This method does **not** read the pin's electrical state.
    pub fn is_set_high(&self) -> Result<bool, C::Error> {
        self.chip.is_set(self.pin)
    }

    /// Return `true` if the pin's output state is LOW.
    ///
    /// This method does **not** read the pin's electrical state.
    pub fn is_set_low(&self) -> Result<bool, C::Error> {
        Ok(!self.is_set_high()?)
    }

    /// Toggle the pin's output state.
    pub fn toggle(&mut self) -> Result<(), C::Error> {
        let high = self.is_set_high()?;
        self.chip.set(self.pin, !high)
    }
}

impl<'a, MODE, C> embedded_hal::digital::ErrorType for Pin<'a, MODE, C>
where
    C: GpioChip,
    C::Error: embedded_hal::digital::Error,
{
    type Error = C::Error;
}

impl<'a, MODE, C> embedded_hal::digital::InputPin for Pin<'a, MODE, C>
where
    MODE: crate::mode::HasInput,
    C: GpioChip,
    C::Error: embedded_hal::digital::Error,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Pin::is_high(self)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Pin::is_low(self)
    }
}

impl<'a, MODE, C> embedded_hal::digital::OutputPin for Pin<'a, MODE, C>
where
    MODE: crate::mode::HasOutput,
    C: GpioChip,
    C::Error: embedded_hal::digital::Error,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Pin::set_low(self)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Pin::set_high(self)
    }
}

impl<'a, MODE, C> embedded_hal::digital::StatefulOutputPin for Pin<'a, MODE, C>
where
    MODE: crate::mode::HasOutput,
    C: GpioChip,
    C::Error: embedded_hal::digital::Error,
{
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Pin::is_set_high(self)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Pin::is_set_low(self)
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        Pin::toggle(self)
    }
}
