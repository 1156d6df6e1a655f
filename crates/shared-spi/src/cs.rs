use embedded_hal::digital::OutputPin;

/// Manually driven chip-select lines.
///
/// Lines are active low: `assert` drives the line low, `deassert` high.
pub trait ChipSelect {
    fn assert(&mut self, line: u8);
    fn deassert(&mut self, line: u8);
}

impl<T: ChipSelect + ?Sized> ChipSelect for &mut T {
    fn assert(&mut self, line: u8) {
        T::assert(self, line)
    }

    fn deassert(&mut self, line: u8) {
        T::deassert(self, line)
    }
}

/// No manually driven lines; chip select is handled elsewhere.
impl ChipSelect for () {
    fn assert(&mut self, _line: u8) {}

    fn deassert(&mut self, _line: u8) {}
}

/// One output pin per line, indexed by line number.
impl<P: OutputPin, const N: usize> ChipSelect for [P; N] {
    fn assert(&mut self, line: u8) {
        match self.get_mut(usize::from(line)) {
            Some(pin) => {
                if pin.set_low().is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("failed to assert chip select line {}", line);
                }
            }
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("no chip select line {}", line);
            }
        }
    }

    fn deassert(&mut self, line: u8) {
        match self.get_mut(usize::from(line)) {
            Some(pin) => {
                if pin.set_high().is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "failed to deassert chip select line {}",
                        line
                    );
                }
            }
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("no chip select line {}", line);
            }
        }
    }
}
