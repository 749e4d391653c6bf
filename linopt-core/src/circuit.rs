//! Linear optical circuit representation

use crate::component::Component;
use crate::expr::Bindings;
use crate::mode::{mode_range, ModeId};
use crate::{OpticsError, Result};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

/// Port list of a placement; most components span one or two modes
pub type Ports = SmallVec<[ModeId; 2]>;

/// What a placement puts on its ports
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Component(Component),
    /// Sub-circuit kept as a unit (composition without merge)
    Circuit(Box<Circuit>),
}

impl Element {
    /// Number of ports the element spans
    pub fn width(&self) -> usize {
        match self {
            Element::Component(c) => c.width(),
            Element::Circuit(c) => c.width(),
        }
    }

    #[inline]
    pub fn is_circuit(&self) -> bool {
        matches!(self, Element::Circuit(_))
    }
}

/// One entry of a circuit: an element and the contiguous ports it spans
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    ports: Ports,
    element: Element,
}

impl Placement {
    /// Place `element` on `offset..offset + element.width()`
    pub fn at(offset: usize, element: Element) -> Self {
        let ports = mode_range(offset, element.width()).collect();
        Self { ports, element }
    }

    /// Create a placement from an explicit port list
    ///
    /// # Errors
    /// Returns [`OpticsError::Shape`] unless `ports` is the contiguous ascending
    /// run of `element.width()` modes starting at `ports[0]`
    pub fn new(ports: &[ModeId], element: Element) -> Result<Self> {
        let width = element.width();
        let offset = ports.first().map(ModeId::index).unwrap_or(0);
        let expected: Ports = mode_range(offset, width).collect();
        if ports != expected.as_slice() {
            return Err(OpticsError::Shape(format!(
                "ports {:?} do not match the {} contiguous ports of the element",
                ports.iter().map(|m| m.index()).collect::<Vec<_>>(),
                width
            )));
        }
        Ok(Self {
            ports: expected,
            element,
        })
    }

    #[inline]
    pub fn ports(&self) -> &[ModeId] {
        &self.ports
    }

    /// First port
    #[inline]
    pub fn offset(&self) -> usize {
        self.ports.first().map(ModeId::index).unwrap_or(0)
    }

    #[inline]
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Last port index + 1
    #[inline]
    fn end(&self) -> usize {
        self.offset() + self.ports.len()
    }
}

/// A linear optical circuit
///
/// Contains an ordered list of placements over `width` modes. Sub-circuits
/// added without merging stay nested; [`Circuit::flatten`] yields the
/// component sequence with ports shifted to this circuit's numbering.
///
/// # Example
/// ```
/// use linopt_core::{Circuit, Component};
///
/// let mut inner = Circuit::new(2);
/// inner.push(Component::bs(0.36)).unwrap();
///
/// let mut c = Circuit::new(3);
/// c.push(Component::ps(0.215))
///     .unwrap()
///     .add_circuit(1, inner, false)
///     .unwrap();
/// assert_eq!(c.len(), 2);
/// assert_eq!(c.ncomponents(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Circuit {
    width: usize,
    name: Option<String>,
    placements: Vec<Placement>,
}

impl Circuit {
    /// Create an empty circuit over `width` modes
    ///
    /// # Panics
    /// Panics if `width` is 0
    pub fn new(width: usize) -> Self {
        assert!(width > 0, "Circuit must have at least one mode");
        Self {
            width,
            name: None,
            placements: Vec::new(),
        }
    }

    /// Create an empty circuit, failing instead of panicking on zero width
    ///
    /// # Errors
    /// Returns [`OpticsError::Shape`] if `width` is 0
    pub fn try_new(width: usize) -> Result<Self> {
        if width == 0 {
            return Err(OpticsError::Shape("circuit must have at least one mode".to_string()));
        }
        Ok(Self::new(width))
    }

    /// Set a display name (builder pattern)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of modes
    #[inline]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of top-level placements
    #[inline]
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Iterate over top-level placements in composition order
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements.iter()
    }

    pub fn get_placement(&self, index: usize) -> Option<&Placement> {
        self.placements.get(index)
    }

    fn check_fits(&self, offset: usize, width: usize) -> Result<()> {
        if width == 0 || offset + width > self.width {
            return Err(OpticsError::port_out_of_range(
                offset + width.max(1) - 1,
                self.width,
            ));
        }
        Ok(())
    }

    /// Add a component on ports `offset..offset + component.width()`
    ///
    /// # Errors
    /// Returns [`OpticsError::Range`] if the component does not fit
    pub fn add(&mut self, offset: usize, component: Component) -> Result<&mut Self> {
        self.check_fits(offset, component.width())?;
        self.placements
            .push(Placement::at(offset, Element::Component(component)));
        Ok(self)
    }

    /// Add a component starting at port 0
    pub fn push(&mut self, component: Component) -> Result<&mut Self> {
        self.add(0, component)
    }

    /// Add a sub-circuit at `offset`
    ///
    /// With `merge`, its components are spliced into this circuit's list;
    /// without, it is kept as one nested placement.
    ///
    /// # Errors
    /// Returns [`OpticsError::Range`] if the sub-circuit does not fit
    pub fn add_circuit(&mut self, offset: usize, circuit: Circuit, merge: bool) -> Result<&mut Self> {
        self.check_fits(offset, circuit.width())?;
        if merge {
            for placement in circuit.placements {
                let shifted = placement.offset() + offset;
                self.placements.push(Placement::at(shifted, placement.element));
            }
        } else {
            self.placements
                .push(Placement::at(offset, Element::Circuit(Box::new(circuit))));
        }
        Ok(self)
    }

    /// Append an already-validated placement
    pub(crate) fn push_placement(&mut self, placement: Placement) -> Result<()> {
        if placement.end() > self.width {
            return Err(OpticsError::port_out_of_range(placement.end() - 1, self.width));
        }
        self.placements.push(placement);
        Ok(())
    }

    /// Components in composition order, ports in this circuit's numbering
    pub fn flatten(&self) -> Vec<(Ports, &Component)> {
        let mut out = Vec::new();
        self.flatten_into(0, &mut out);
        out
    }

    fn flatten_into<'a>(&'a self, shift: usize, out: &mut Vec<(Ports, &'a Component)>) {
        for placement in &self.placements {
            match &placement.element {
                Element::Component(c) => {
                    let ports = placement.ports.iter().map(|m| m.offset(shift)).collect();
                    out.push((ports, c));
                },
                Element::Circuit(sub) => sub.flatten_into(shift + placement.offset(), out),
            }
        }
    }

    /// Number of components after flattening
    pub fn ncomponents(&self) -> usize {
        self.placements
            .iter()
            .map(|p| match &p.element {
                Element::Component(_) => 1,
                Element::Circuit(sub) => sub.ncomponents(),
            })
            .sum()
    }

    /// Nesting depth: 0 for a circuit without sub-circuits
    pub fn depth(&self) -> usize {
        self.placements
            .iter()
            .map(|p| match &p.element {
                Element::Component(_) => 0,
                Element::Circuit(sub) => 1 + sub.depth(),
            })
            .max()
            .unwrap_or(0)
    }

    /// Validate the circuit
    ///
    /// Checks that every placement fits inside the circuit and spans exactly
    /// its element's width, recursively.
    pub fn validate(&self) -> Result<()> {
        for (i, placement) in self.placements.iter().enumerate() {
            if placement.end() > self.width {
                return Err(OpticsError::Validation(format!(
                    "placement {} uses port {} in a circuit of width {}",
                    i,
                    placement.end() - 1,
                    self.width
                )));
            }
            if placement.ports.len() != placement.element.width() {
                return Err(OpticsError::Validation(format!(
                    "placement {} spans {} ports but its element needs {}",
                    i,
                    placement.ports.len(),
                    placement.element.width()
                )));
            }
            if let Element::Circuit(sub) = &placement.element {
                sub.validate()?;
            }
        }
        Ok(())
    }

    /// Whether any component parameter is symbolic
    pub fn is_symbolic(&self) -> bool {
        self.flatten().iter().any(|(_, c)| c.is_symbolic())
    }

    /// Free variables of every component
    pub fn free_symbols(&self) -> BTreeSet<String> {
        self.flatten()
            .iter()
            .flat_map(|(_, c)| c.free_symbols())
            .collect()
    }

    /// Bind free variables, keeping the nesting structure
    pub fn subs(&self, bindings: &Bindings) -> Circuit {
        Circuit {
            width: self.width,
            name: self.name.clone(),
            placements: self
                .placements
                .iter()
                .map(|p| Placement {
                    ports: p.ports.clone(),
                    element: match &p.element {
                        Element::Component(c) => Element::Component(c.subs(bindings)),
                        Element::Circuit(sub) => Element::Circuit(Box::new(sub.subs(bindings))),
                    },
                })
                .collect(),
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Circuit({} modes, {} placements)",
            self.width,
            self.len()
        )?;
        for (i, p) in self.placements.iter().enumerate() {
            let ports: Vec<usize> = p.ports.iter().map(|m| m.index()).collect();
            match &p.element {
                Element::Component(c) => writeln!(f, "  {}: {:?} {}", i, ports, c)?,
                Element::Circuit(sub) => writeln!(
                    f,
                    "  {}: {:?} <sub-circuit {}, {} components>",
                    i,
                    ports,
                    sub.name().unwrap_or("unnamed"),
                    sub.ncomponents()
                )?,
            }
        }
        Ok(())
    }
}
