use std::collections::HashMap;

use crate::vm::Segment;

/// Storage class of a Jack variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Static,
    Field,
    Arg,
    Local,
}

impl Kind {
    /// The VM segment a variable of this kind lives in.
    pub fn segment(&self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Arg => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }
}

/// One named variable: its declared type, storage class, and running index
/// within that (kind, scope) bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub ty: String,
    pub kind: Kind,
    pub index: u16,
}

/// Two-scope name resolution for one class compilation.
///
/// Static and field entries live for the whole class; argument and local
/// entries are cleared at each subroutine entry. Lookup tries the subroutine
/// scope first, so a local may shadow a field of the same name.
pub struct SymbolTable {
    class_scope: HashMap<String, Entry>,
    subroutine_scope: HashMap<String, Entry>,
    static_count: u16,
    field_count: u16,
    arg_count: u16,
    local_count: u16,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            class_scope: HashMap::new(),
            subroutine_scope: HashMap::new(),
            static_count: 0,
            field_count: 0,
            arg_count: 0,
            local_count: 0,
        }
    }

    /// Open a fresh subroutine scope. Class-level entries and counters are
    /// untouched.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.arg_count = 0;
        self.local_count = 0;
    }

    /// Insert a variable. A name already present in the same scope is
    /// overwritten; the counter still advances, so the newest definition
    /// gets a fresh index.
    pub fn define(&mut self, name: &str, ty: &str, kind: Kind) {
        let (scope, counter) = match kind {
            Kind::Static => (&mut self.class_scope, &mut self.static_count),
            Kind::Field => (&mut self.class_scope, &mut self.field_count),
            Kind::Arg => (&mut self.subroutine_scope, &mut self.arg_count),
            Kind::Local => (&mut self.subroutine_scope, &mut self.local_count),
        };
        scope.insert(
            name.to_string(),
            Entry {
                ty: ty.to_string(),
                kind,
                index: *counter,
            },
        );
        *counter += 1;
    }

    /// Resolve a name, subroutine scope first.
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.lookup(name).map(|e| e.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|e| e.ty.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.lookup(name).map(|e| e.index)
    }

    /// Whether `name` resolves in either scope. Decides if `X.foo()` is a
    /// method call on variable `X` or a function call on class `X`.
    pub fn defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Number of field words — the object size a constructor allocates.
    pub fn field_count(&self) -> u16 {
        self.field_count
    }

    /// Number of locals declared in the current subroutine.
    pub fn local_count(&self) -> u16 {
        self.local_count
    }
}
