//! Cached per-type models
//!
//! `TypeModel::get` is a pure, memoized function of the type: the first
//! request walks the registered class and its ancestry, builds the member
//! models and the accessor engine, and publishes the result in a
//! process-wide cache. Concurrent first-time requests may race to build
//! duplicate candidates; duplicates are cheap and pure, and only the first
//! published model is ever returned to later callers.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use mirra_core::class::{ProjectMutThunk, ProjectThunk, RawClass};
use mirra_core::registry;
use mirra_core::{TypeRef, Value};

use crate::engine::{self, AccessorEngine, MemberRef, SynthesisPolicy};
use crate::error::{ReflectError, ReflectResult};
use crate::generics::GenericTypeResolver;
use crate::member::{
    pair_accessors, ConstructorModel, FieldModel, MethodModel, PairedAccessor,
};

static MODELS: Lazy<DashMap<TypeId, Arc<TypeModel>>> = Lazy::new(DashMap::new);

type Chain = Vec<(ProjectThunk, ProjectMutThunk)>;

/// The per-type aggregate: ordered member models plus one accessor engine
pub struct TypeModel {
    ty: TypeRef,
    name: String,
    raw: Arc<RawClass>,
    fields: Vec<FieldModel>,
    methods: Vec<MethodModel>,
    constructors: Vec<ConstructorModel>,
    field_index: FxHashMap<String, usize>,
    method_index: FxHashMap<String, Vec<usize>>,
    engine: Arc<AccessorEngine>,
    default_ctor: Option<usize>,
}

impl TypeModel {
    /// Cached model for a Rust type
    pub fn of<T: Any + ?Sized>() -> ReflectResult<Arc<TypeModel>> {
        Self::get(TypeRef::of::<T>())
    }

    /// Cached model for a type handle. Builds on first request; fails only
    /// when no metadata was registered for the type.
    pub fn get(ty: TypeRef) -> ReflectResult<Arc<TypeModel>> {
        if let Some(model) = MODELS.get(&ty.id()) {
            return Ok(model.clone());
        }
        // Concurrent first requests may both reach here; both builds are
        // pure and the entry API retains exactly one.
        let candidate = Arc::new(Self::build(ty, engine::synthesis_default())?);
        let published = MODELS.entry(ty.id()).or_insert(candidate).clone();
        Ok(published)
    }

    /// Build a model without touching the cache. Used by tests and
    /// benchmarks to compare synthesis policies on the same type.
    pub fn build_with_policy(ty: TypeRef, policy: SynthesisPolicy) -> ReflectResult<TypeModel> {
        Self::build(ty, policy)
    }

    fn build(ty: TypeRef, policy: SynthesisPolicy) -> ReflectResult<TypeModel> {
        let raw = registry::lookup(ty.id()).ok_or_else(|| ReflectError::TypeUnavailable {
            type_name: ty.name().to_string(),
        })?;

        // Walk the type and every registered ancestor, own level first.
        // Each level carries the projection chain from a modeled-type
        // instance down to that level's fragment.
        let mut levels: Vec<(Arc<RawClass>, Chain)> = vec![(raw.clone(), Vec::new())];
        let mut seen = vec![ty.id()];
        let mut chain: Chain = Vec::new();
        let mut current = raw.clone();
        while let Some(edge) = current.parent.clone() {
            if seen.contains(&edge.ty.id()) {
                break;
            }
            seen.push(edge.ty.id());
            chain.push((edge.project.clone(), edge.project_mut.clone()));
            match registry::lookup(edge.ty.id()) {
                Some(parent) => {
                    levels.push((parent.clone(), chain.clone()));
                    current = parent;
                }
                None => break,
            }
        }

        // Collect members level by level, skipping synthetic ones entirely
        let mut field_locs: Vec<(usize, usize)> = Vec::new();
        let mut method_locs: Vec<(usize, usize)> = Vec::new();
        let mut ctor_locs: Vec<(usize, usize)> = Vec::new();
        for (depth, (level, _)) in levels.iter().enumerate() {
            for (i, f) in level.fields.iter().enumerate() {
                if !f.modifiers.is_synthetic {
                    field_locs.push((depth, i));
                }
            }
            for (i, m) in level.methods.iter().enumerate() {
                if !m.modifiers.is_synthetic {
                    method_locs.push((depth, i));
                }
            }
            for (i, _) in level.constructors.iter().enumerate() {
                ctor_locs.push((depth, i));
            }
        }

        let member_ref = |depth: usize, index: usize| MemberRef {
            declaring: levels[depth].0.clone(),
            index,
            chain: levels[depth].1.clone(),
        };

        // Accessor index assignment: every field gets a get/set slot;
        // abstract methods are recorded but get no invoke slot; only
        // constructors declared on the modeled type get construct slots.
        let field_refs: Vec<MemberRef> = field_locs
            .iter()
            .map(|&(d, i)| member_ref(d, i))
            .collect();

        let mut method_slots: Vec<Option<usize>> = Vec::with_capacity(method_locs.len());
        let mut method_refs: Vec<MemberRef> = Vec::new();
        for &(d, i) in &method_locs {
            if levels[d].0.methods[i].is_invokable() {
                method_slots.push(Some(method_refs.len()));
                method_refs.push(member_ref(d, i));
            } else {
                method_slots.push(None);
            }
        }

        let mut ctor_slots: Vec<Option<usize>> = Vec::with_capacity(ctor_locs.len());
        let mut ctor_refs: Vec<MemberRef> = Vec::new();
        for &(d, i) in &ctor_locs {
            if d == 0 {
                ctor_slots.push(Some(ctor_refs.len()));
                ctor_refs.push(member_ref(d, i));
            } else {
                ctor_slots.push(None);
            }
        }

        let engine = Arc::new(AccessorEngine::build(
            ty,
            raw.name.clone(),
            field_refs,
            method_refs,
            ctor_refs,
            policy,
        ));

        // Method models
        let mut methods = Vec::with_capacity(method_locs.len());
        let mut method_index: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (pos, &(d, i)) in method_locs.iter().enumerate() {
            let m = &levels[d].0.methods[i];
            let resolved_return = match &m.generic_return {
                Some(expr) => Some(GenericTypeResolver::resolve(expr, ty)?),
                None => None,
            };
            method_index.entry(m.name.clone()).or_default().push(pos);
            methods.push(MethodModel {
                name: m.name.clone(),
                params: m.params.clone(),
                return_type: m.return_type,
                generic_return: m.generic_return.clone(),
                resolved_return,
                declaring: levels[d].0.ty,
                declaring_name: levels[d].0.name.clone(),
                modifiers: m.modifiers,
                declared_here: d == 0,
                accessor_index: method_slots[pos],
                engine: engine.clone(),
            });
        }

        // Field models, with getter/setter pairing against the full
        // collected method list
        let raw_methods: Vec<&mirra_core::RawMethod> = method_locs
            .iter()
            .map(|&(d, i)| &levels[d].0.methods[i])
            .collect();
        let mut fields = Vec::with_capacity(field_locs.len());
        let mut field_index = FxHashMap::default();
        for (pos, &(d, i)) in field_locs.iter().enumerate() {
            let f = &levels[d].0.fields[i];
            let (getter, setter) = pair_accessors(f, &raw_methods);
            let paired = |m: Option<usize>| {
                m.and_then(|method| {
                    method_slots[method].map(|slot| PairedAccessor { method, slot })
                })
            };
            let resolved = match &f.generic {
                Some(expr) => Some(GenericTypeResolver::resolve(expr, ty)?),
                None => None,
            };
            field_index.entry(f.name.clone()).or_insert(pos);
            fields.push(FieldModel {
                name: f.name.clone(),
                ty: f.ty,
                generic: f.generic.clone(),
                resolved,
                declaring: levels[d].0.ty,
                declaring_name: levels[d].0.name.clone(),
                modifiers: f.modifiers,
                declared_here: d == 0,
                accessor_index: Some(pos),
                getter: paired(getter),
                setter: paired(setter),
                engine: engine.clone(),
            });
        }

        // Constructor models; the first declared zero-argument form becomes
        // the default constructor
        let mut constructors = Vec::with_capacity(ctor_locs.len());
        let mut default_ctor = None;
        for (pos, &(d, i)) in ctor_locs.iter().enumerate() {
            let c = &levels[d].0.constructors[i];
            if default_ctor.is_none() && d == 0 && c.is_default() {
                default_ctor = Some(pos);
            }
            constructors.push(ConstructorModel {
                params: c.params.clone(),
                declaring: levels[d].0.ty,
                declaring_name: levels[d].0.name.clone(),
                modifiers: c.modifiers,
                declared_here: d == 0,
                accessor_index: ctor_slots[pos],
                engine: engine.clone(),
            });
        }

        tracing::debug!(
            class = %raw.name,
            fields = fields.len(),
            methods = methods.len(),
            constructors = constructors.len(),
            "type model built"
        );

        Ok(TypeModel {
            ty,
            name: raw.name.clone(),
            raw,
            fields,
            methods,
            constructors,
            field_index,
            method_index,
            engine,
            default_ctor,
        })
    }

    /// Registered name of the modeled type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of the modeled type
    pub fn type_ref(&self) -> TypeRef {
        self.ty
    }

    /// Raw registered metadata backing this model
    pub(crate) fn raw(&self) -> &Arc<RawClass> {
        &self.raw
    }

    /// All fields, own declarations first, then each ancestor's
    pub fn fields(&self) -> &[FieldModel] {
        &self.fields
    }

    /// All recorded methods, including abstract declarations
    pub fn methods(&self) -> &[MethodModel] {
        &self.methods
    }

    /// All recorded constructors, including inherited records
    pub fn constructors(&self) -> &[ConstructorModel] {
        &self.constructors
    }

    /// Field by name; the most-derived declaration wins on shadowing
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    /// First method with the given name
    pub fn method(&self, name: &str) -> Option<&MethodModel> {
        self.method_index
            .get(name)
            .and_then(|positions| positions.first())
            .map(|&i| &self.methods[i])
    }

    /// Method with the given name and parameter count
    pub fn method_with_arity(&self, name: &str, arity: usize) -> Option<&MethodModel> {
        self.method_index.get(name).and_then(|positions| {
            positions
                .iter()
                .map(|&i| &self.methods[i])
                .find(|m| m.arity() == arity)
        })
    }

    /// The default (zero-argument) constructor, when one is declared
    pub fn default_constructor(&self) -> Option<&ConstructorModel> {
        self.default_ctor.map(|i| &self.constructors[i])
    }

    /// The engine dispatching for this model
    pub fn engine(&self) -> &Arc<AccessorEngine> {
        &self.engine
    }

    /// Construct a fresh instance through the default constructor.
    /// Never memoized: every call constructs anew.
    pub fn new_instance(&self) -> ReflectResult<Box<dyn Any + Send + Sync>> {
        self.engine.construct()
    }

    /// Whether a value is an instance of the modeled type or of a
    /// registered descendant
    pub fn is_instance_of(&self, value: &dyn Any) -> bool {
        registry::is_subclass_of(value.type_id(), self.ty.id())
    }

    /// Read a field by name through its accessor slot
    pub fn get_field(&self, instance: &dyn Any, name: &str) -> ReflectResult<Value> {
        match self.field(name) {
            Some(field) => field.get_value(instance, false),
            None => Err(ReflectError::MemberNotFound {
                member: name.to_string(),
                type_name: self.name.clone(),
            }),
        }
    }
}

impl std::fmt::Debug for TypeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeModel")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
