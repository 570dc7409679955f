//! Host-side interface descriptors and the dispatch table built from them.
//!
//! An [`InterfaceDescriptor`] is the registration-time description of the
//! methods a script object is expected to implement. Binding validates it and
//! turns it into a [`MethodTable`]: an insertion-ordered map from method name to
//! signature. A method's position in that table is its [`MethodId`], the
//! identifier the engine uses to route calls.

use indexmap::{IndexMap, map::Entry};
use serde::{Deserialize, Serialize};

use crate::{
    engine::MethodId,
    error::{BindingError, DispatchError},
    value::ValueType,
};

/// Name, parameter types and return type of one interface method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    name: String,
    params: Vec<ValueType>,
    returns: Option<ValueType>,
    variadic: bool,
}

impl MethodSignature {
    /// A method with no parameters and no return value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            variadic: false,
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, ty: ValueType) -> Self {
        self.params.push(ty);
        self
    }

    /// Sets the declared return type.
    #[must_use]
    pub fn returns(mut self, ty: ValueType) -> Self {
        self.returns = Some(ty);
        self
    }

    /// Sets the declared return type, `None` meaning void.
    #[must_use]
    pub fn returns_opt(mut self, ty: Option<ValueType>) -> Self {
        self.returns = ty;
        self
    }

    /// Marks the last parameter as repeating: the method accepts any number of
    /// trailing arguments of that type.
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Declared return type, `None` for void.
    #[must_use]
    pub fn return_type(&self) -> Option<ValueType> {
        self.returns
    }

    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Declared type of the argument at `index`, following the repeating last
    /// parameter of variadic methods. `None` if the index is out of range.
    #[must_use]
    pub fn param_type(&self, index: usize) -> Option<ValueType> {
        match self.params.get(index) {
            Some(ty) => Some(*ty),
            None if self.variadic => Some(self.params.last().copied().unwrap_or(ValueType::Any)),
            None => None,
        }
    }

    /// Number of arguments a call must pass at minimum.
    #[must_use]
    pub fn min_args(&self) -> usize {
        if self.variadic {
            self.params.len().saturating_sub(1)
        } else {
            self.params.len()
        }
    }

    /// Checks that a call with `actual` arguments matches this signature.
    pub fn check_arity(&self, actual: usize) -> Result<(), DispatchError> {
        let min = self.min_args();
        let ok = if self.variadic { actual >= min } else { actual == min };
        if ok {
            Ok(())
        } else {
            Err(DispatchError::Arity {
                method: self.name.clone(),
                expected: min,
                variadic: self.variadic,
                actual,
            })
        }
    }
}

/// Description of the interface a bound script object implements.
///
/// Typically produced by [`js_interface!`](crate::js_interface), but can be
/// assembled by hand for dynamically discovered interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    name: String,
    extends: Vec<String>,
    methods: Vec<MethodSignature>,
}

impl InterfaceDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Records a parent interface. Binding rejects descriptors that have any.
    #[must_use]
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }

    /// Appends a method declaration.
    #[must_use]
    pub fn method(mut self, signature: MethodSignature) -> Self {
        self.methods.push(signature);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parents(&self) -> &[String] {
        &self.extends
    }

    /// Method declarations in declaration order, duplicates included.
    #[must_use]
    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }
}

/// Ordered dispatch table of a bound interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTable {
    interface: String,
    methods: IndexMap<String, MethodSignature>,
}

impl MethodTable {
    /// Validates `descriptor` and builds its table.
    ///
    /// Fails if the interface extends another interface, or on the first method
    /// name declared twice.
    pub fn build(descriptor: &InterfaceDescriptor) -> Result<Self, BindingError> {
        if !descriptor.extends.is_empty() {
            return Err(BindingError::ExtendsInterface {
                interface: descriptor.name.clone(),
                parents: descriptor.extends.clone(),
            });
        }

        let mut methods = IndexMap::with_capacity(descriptor.methods.len());
        for signature in &descriptor.methods {
            match methods.entry(signature.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(BindingError::OverloadedMethod {
                        interface: descriptor.name.clone(),
                        method: signature.name.clone(),
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(signature.clone());
                }
            }
        }

        Ok(Self {
            interface: descriptor.name.clone(),
            methods,
        })
    }

    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Looks up a method by name.
    pub fn resolve(&self, method: &str) -> Result<(MethodId, &MethodSignature), DispatchError> {
        self.methods
            .get_full(method)
            .map(|(index, _, signature)| (MethodId(index), signature))
            .ok_or_else(|| DispatchError::UnknownMethod {
                interface: self.interface.clone(),
                method: method.to_owned(),
            })
    }

    /// Looks up a method by its position.
    pub fn get(&self, id: MethodId) -> Result<&MethodSignature, DispatchError> {
        self.methods
            .get_index(id.0)
            .map(|(_, signature)| signature)
            .ok_or_else(|| DispatchError::UnknownMethodId {
                interface: self.interface.clone(),
                id: id.0,
            })
    }

    /// Signatures in dispatch order.
    pub fn signatures(&self) -> impl ExactSizeIterator<Item = &MethodSignature> {
        self.methods.values()
    }

    /// Ordered method list as handed to the engine.
    #[must_use]
    pub fn to_vec(&self) -> Vec<MethodSignature> {
        self.methods.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
