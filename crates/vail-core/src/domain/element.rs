//! Paddle inputs and keyed elements.

/// A keying element produced by the iambic keyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Dit,
    Dah,
}

impl Element {
    /// The other element; a squeeze alternates between the two.
    pub fn opposite(self) -> Self {
        match self {
            Element::Dit => Element::Dah,
            Element::Dah => Element::Dit,
        }
    }
}

/// How a [`KeyElement`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Dit,
    Dah,
    /// A straight-key press of operator-controlled length.
    Manual,
}

impl From<Element> for ElementKind {
    fn from(element: Element) -> Self {
        match element {
            Element::Dit => ElementKind::Dit,
            Element::Dah => ElementKind::Dah,
        }
    }
}

/// A completed keying action, ready to be transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyElement {
    pub kind: ElementKind,
    pub duration_ms: u16,
    /// Wall-clock time at which keying started, in Unix epoch milliseconds.
    pub started_at_ms: u64,
}

/// One of the two paddle contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Contact {
    Dit,
    Dah,
}

/// Instantaneous paddle levels, normalised so that `true` means pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaddleState {
    pub dit: bool,
    pub dah: bool,
}

impl PaddleState {
    pub const RELEASED: Self = Self {
        dit: false,
        dah: false,
    };

    pub fn new(dit: bool, dah: bool) -> Self {
        Self { dit, dah }
    }

    /// Whether `contact` is pressed.
    pub fn is_active(&self, contact: Contact) -> bool {
        match contact {
            Contact::Dit => self.dit,
            Contact::Dah => self.dah,
        }
    }

    /// Whether the paddle that keys `element` is pressed.
    pub fn keys(&self, element: Element) -> bool {
        match element {
            Element::Dit => self.dit,
            Element::Dah => self.dah,
        }
    }
}

/// Electrical wiring of the contacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Polarity {
    /// Contact pulls the pin to the supply rail when pressed (pull-down wiring).
    #[default]
    ActiveHigh,
    /// Contact pulls the pin to ground when pressed (pull-up wiring).
    ActiveLow,
}

impl Polarity {
    /// Converts a raw pin level into "pressed".
    pub fn is_pressed(self, level_high: bool) -> bool {
        match self {
            Polarity::ActiveHigh => level_high,
            Polarity::ActiveLow => !level_high,
        }
    }

    /// The raw pin level corresponding to `pressed`.
    pub fn level_for(self, pressed: bool) -> bool {
        self.is_pressed(pressed)
    }
}

/// A transition captured by the pin interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddleEvent {
    /// Local monotonic milliseconds at the interrupt, wrapping at `u32::MAX`.
    pub timestamp_ms: u32,
    pub pressed: bool,
    pub source: Contact,
}
