//! Accessor engine: dense dispatch tables with per-member fallback
//!
//! Built exactly once per type model and immutable afterwards, so the
//! dispatch path needs no locking. Each member gets a slot keyed by its
//! accessor index. A synthesized slot holds the member's typed fast accessor
//! with the ancestor projection chain pre-composed at build time and
//! primitive unboxing inlined; steady-state cost is one table lookup plus
//! one direct call. Members without a typed accessor — and every member when
//! synthesis is disabled — degrade to a fallback slot that routes through
//! the erased substrate path, which re-projects and re-validates on every
//! call. Degrading is per member and never aborts a build.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mirra_core::class::{
    FastConstruct, FastGet, FastMethod, ProjectMutThunk, ProjectThunk, RawClass,
};
use mirra_core::registry;
use mirra_core::{CoreError, CoreResult, FastSet, TypeRef, Value, ValueKind};

use crate::error::{ReflectError, ReflectResult};

// ============================================================================
// Synthesis policy
// ============================================================================

/// Whether a build synthesizes fast dispatch slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisPolicy {
    /// Synthesize fast slots where typed accessors exist (the default)
    Enabled,
    /// Force every slot to the fallback path
    Disabled,
}

static SYNTHESIS_DEFAULT: AtomicBool = AtomicBool::new(true);

/// Set the process-wide default synthesis policy.
///
/// The policy is sampled when an engine is built; models already cached keep
/// the tables they were built with.
pub fn set_synthesis_default(enabled: bool) {
    SYNTHESIS_DEFAULT.store(enabled, Ordering::Relaxed);
}

/// Current process-wide default synthesis policy
pub fn synthesis_default() -> SynthesisPolicy {
    if SYNTHESIS_DEFAULT.load(Ordering::Relaxed) {
        SynthesisPolicy::Enabled
    } else {
        SynthesisPolicy::Disabled
    }
}

// ============================================================================
// Member references and slots
// ============================================================================

/// Location of a raw member relative to the modeled type: the declaring
/// class, the member's index inside it, and the projection chain from a
/// modeled-type instance down to the declaring fragment
pub(crate) struct MemberRef {
    pub declaring: Arc<RawClass>,
    pub index: usize,
    pub chain: Vec<(ProjectThunk, ProjectMutThunk)>,
}

impl MemberRef {
    fn project_ref<'a>(&self, target: &'a dyn Any, expected: &str) -> CoreResult<&'a dyn Any> {
        let mut current = target;
        for (project, _) in &self.chain {
            let got = current.type_id();
            current = project(current).ok_or_else(|| CoreError::TargetMismatch {
                expected: expected.to_string(),
                got: registry::display_name(got),
            })?;
        }
        Ok(current)
    }

    fn project_mut<'a>(
        &self,
        target: &'a mut dyn Any,
        expected: &str,
    ) -> CoreResult<&'a mut dyn Any> {
        let mut current = target;
        for (_, project) in &self.chain {
            let got = (*current).type_id();
            current = project(current).ok_or_else(|| CoreError::TargetMismatch {
                expected: expected.to_string(),
                got: registry::display_name(got),
            })?;
        }
        Ok(current)
    }
}

enum FastGetSlot {
    Bool(Box<dyn Fn(&dyn Any) -> Option<bool> + Send + Sync>),
    I64(Box<dyn Fn(&dyn Any) -> Option<i64> + Send + Sync>),
    F64(Box<dyn Fn(&dyn Any) -> Option<f64> + Send + Sync>),
    Str(Box<dyn Fn(&dyn Any) -> Option<Arc<str>> + Send + Sync>),
    Boxed(Box<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>),
}

type FastSetSlot = Box<dyn Fn(&mut dyn Any, &Value) -> Option<()> + Send + Sync>;

enum FastInvokeSlot {
    Ref(Box<dyn Fn(&dyn Any, &[Value]) -> Option<Value> + Send + Sync>),
    Mut(Box<dyn Fn(&mut dyn Any, &[Value]) -> Option<Value> + Send + Sync>),
    Static(Arc<dyn Fn(&[Value]) -> Option<Value> + Send + Sync>),
}

struct GetSlot {
    member: MemberRef,
    declared_kind: ValueKind,
    fast: Option<FastGetSlot>,
}

struct SetSlot {
    member: MemberRef,
    fast: Option<FastSetSlot>,
}

struct InvokeSlot {
    member: MemberRef,
    fast: Option<FastInvokeSlot>,
}

struct ConstructSlot {
    member: MemberRef,
    fast: Option<FastConstruct>,
}

fn kind_of(ty: &TypeRef) -> ValueKind {
    if ty.is::<bool>() {
        ValueKind::Bool
    } else if ty.is::<i32>() {
        ValueKind::I32
    } else if ty.is::<i64>() {
        ValueKind::I64
    } else if ty.is::<f64>() {
        ValueKind::F64
    } else if ty.is::<String>() || ty.is::<Arc<str>>() {
        ValueKind::Str
    } else {
        ValueKind::Object
    }
}

fn ref_chain(member: &MemberRef) -> Vec<ProjectThunk> {
    member.chain.iter().map(|(p, _)| p.clone()).collect()
}

fn mut_chain(member: &MemberRef) -> Vec<ProjectMutThunk> {
    member.chain.iter().map(|(_, p)| p.clone()).collect()
}

fn compose_get(member: &MemberRef, fast: &FastGet) -> FastGetSlot {
    let chain = ref_chain(member);
    match fast {
        FastGet::Bool(f) => {
            let f = f.clone();
            FastGetSlot::Bool(Box::new(move |any| {
                let mut current = any;
                for project in &chain {
                    current = project(current)?;
                }
                f(current)
            }))
        }
        FastGet::I64(f) => {
            let f = f.clone();
            FastGetSlot::I64(Box::new(move |any| {
                let mut current = any;
                for project in &chain {
                    current = project(current)?;
                }
                f(current)
            }))
        }
        FastGet::F64(f) => {
            let f = f.clone();
            FastGetSlot::F64(Box::new(move |any| {
                let mut current = any;
                for project in &chain {
                    current = project(current)?;
                }
                f(current)
            }))
        }
        FastGet::Str(f) => {
            let f = f.clone();
            FastGetSlot::Str(Box::new(move |any| {
                let mut current = any;
                for project in &chain {
                    current = project(current)?;
                }
                f(current)
            }))
        }
        FastGet::Boxed(f) => {
            let f = f.clone();
            FastGetSlot::Boxed(Box::new(move |any| {
                let mut current = any;
                for project in &chain {
                    current = project(current)?;
                }
                f(current)
            }))
        }
    }
}

fn compose_set(member: &MemberRef, fast: &FastSet) -> FastSetSlot {
    let chain = mut_chain(member);
    let f = fast.clone();
    Box::new(move |any, value| {
        let mut current = any;
        for project in &chain {
            current = project(current)?;
        }
        f(current, value)
    })
}

fn compose_invoke(member: &MemberRef, fast: &FastMethod) -> FastInvokeSlot {
    match fast {
        FastMethod::Ref(f) => {
            let chain = ref_chain(member);
            let f = f.clone();
            FastInvokeSlot::Ref(Box::new(move |any, args| {
                let mut current = any;
                for project in &chain {
                    current = project(current)?;
                }
                f(current, args)
            }))
        }
        FastMethod::Mut(f) => {
            let chain = mut_chain(member);
            let f = f.clone();
            FastInvokeSlot::Mut(Box::new(move |any, args| {
                let mut current = any;
                for project in &chain {
                    current = project(current)?;
                }
                f(current, args)
            }))
        }
        FastMethod::Static(f) => FastInvokeSlot::Static(f.clone()),
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Immutable per-type dispatch tables for construct/invoke/get/set
pub struct AccessorEngine {
    ty: TypeRef,
    name: String,
    policy: SynthesisPolicy,
    get_slots: Vec<GetSlot>,
    set_slots: Vec<SetSlot>,
    invoke_slots: Vec<InvokeSlot>,
    construct_slots: Vec<ConstructSlot>,
    default_ctor: Option<usize>,
}

impl AccessorEngine {
    /// Build the dispatch tables from ordered member locations. `fields`
    /// drive the get/set tables, `methods` (invokable members only) the
    /// invoke table, `constructors` (declared on the modeled type) the
    /// construct table.
    pub(crate) fn build(
        ty: TypeRef,
        name: String,
        fields: Vec<MemberRef>,
        methods: Vec<MemberRef>,
        constructors: Vec<MemberRef>,
        policy: SynthesisPolicy,
    ) -> Self {
        let synthesize = policy == SynthesisPolicy::Enabled;

        let get_slots = fields
            .iter()
            .map(|member| {
                let raw = &member.declaring.fields[member.index];
                let fast = if synthesize {
                    raw.fast_get.as_ref().map(|f| compose_get(member, f))
                } else {
                    None
                };
                if synthesize && fast.is_none() {
                    tracing::debug!(class = %name, field = %raw.name, "no typed getter; fallback slot");
                }
                GetSlot {
                    member: MemberRef {
                        declaring: member.declaring.clone(),
                        index: member.index,
                        chain: member.chain.clone(),
                    },
                    declared_kind: kind_of(&raw.ty),
                    fast,
                }
            })
            .collect();

        let set_slots = fields
            .into_iter()
            .map(|member| {
                let raw = &member.declaring.fields[member.index];
                let fast = if synthesize {
                    raw.fast_set.as_ref().map(|f| compose_set(&member, f))
                } else {
                    None
                };
                SetSlot { member, fast }
            })
            .collect();

        let invoke_slots = methods
            .into_iter()
            .map(|member| {
                let raw = &member.declaring.methods[member.index];
                let fast = if synthesize {
                    raw.fast.as_ref().map(|f| compose_invoke(&member, f))
                } else {
                    None
                };
                if synthesize && fast.is_none() {
                    tracing::debug!(class = %name, method = %raw.name, "no typed thunk; fallback slot");
                }
                InvokeSlot { member, fast }
            })
            .collect();

        let construct_slots: Vec<ConstructSlot> = constructors
            .into_iter()
            .map(|member| {
                let raw = &member.declaring.constructors[member.index];
                let fast = if synthesize { raw.fast.clone() } else { None };
                ConstructSlot { member, fast }
            })
            .collect();

        let default_ctor = construct_slots.iter().position(|slot| {
            slot.member.declaring.constructors[slot.member.index].is_default()
        });

        AccessorEngine {
            ty,
            name,
            policy,
            get_slots,
            set_slots,
            invoke_slots,
            construct_slots,
            default_ctor,
        }
    }

    /// Type the engine dispatches for
    pub fn type_ref(&self) -> TypeRef {
        self.ty
    }

    /// Registered name of the dispatched type
    pub fn type_name(&self) -> &str {
        &self.name
    }

    /// Policy the tables were built under
    pub fn policy(&self) -> SynthesisPolicy {
        self.policy
    }

    fn out_of_range(&self, index: usize) -> ReflectError {
        ReflectError::IndexOutOfRange {
            index,
            type_name: self.name.clone(),
        }
    }

    /// Construct through the default (zero-argument) constructor
    pub fn construct(&self) -> ReflectResult<Box<dyn Any + Send + Sync>> {
        match self.default_ctor {
            Some(index) => self.construct_at(index, &[]),
            None => Err(ReflectError::NoDefaultConstructor {
                type_name: self.name.clone(),
            }),
        }
    }

    /// Construct through the constructor at `index`
    pub fn construct_at(
        &self,
        index: usize,
        args: &[Value],
    ) -> ReflectResult<Box<dyn Any + Send + Sync>> {
        let slot = self
            .construct_slots
            .get(index)
            .ok_or_else(|| self.out_of_range(index))?;
        if args.is_empty() {
            if let Some(fast) = &slot.fast {
                return Ok(fast());
            }
        }
        let raw = &slot.member.declaring.constructors[slot.member.index];
        raw.call(args)
            .map_err(|e| ReflectError::from_core("<init>", &self.name, e))
    }

    /// Invoke the method at `index` with a mutable receiver
    pub fn invoke(
        &self,
        target: &mut dyn Any,
        index: usize,
        args: &[Value],
    ) -> ReflectResult<Value> {
        let slot = self
            .invoke_slots
            .get(index)
            .ok_or_else(|| self.out_of_range(index))?;
        if let Some(fast) = &slot.fast {
            let hit = match fast {
                FastInvokeSlot::Ref(f) => f(&*target, args),
                FastInvokeSlot::Mut(f) => f(target, args),
                FastInvokeSlot::Static(f) => f(args),
            };
            if let Some(value) = hit {
                return Ok(value);
            }
        }
        let raw = &slot.member.declaring.methods[slot.member.index];
        let result = if raw.modifiers.is_static {
            raw.call_mut(target, args)
        } else {
            slot.member
                .project_mut(target, &slot.member.declaring.name)
                .and_then(|receiver| raw.call_mut(receiver, args))
        };
        result.map_err(|e| ReflectError::from_core(&raw.name, &self.name, e))
    }

    /// Invoke the method at `index` with a shared receiver.
    /// Mutable-receiver bodies fail with a receiver mismatch.
    pub fn invoke_ref(
        &self,
        target: &dyn Any,
        index: usize,
        args: &[Value],
    ) -> ReflectResult<Value> {
        let slot = self
            .invoke_slots
            .get(index)
            .ok_or_else(|| self.out_of_range(index))?;
        if let Some(fast) = &slot.fast {
            let hit = match fast {
                FastInvokeSlot::Ref(f) => f(target, args),
                FastInvokeSlot::Static(f) => f(args),
                FastInvokeSlot::Mut(_) => None,
            };
            if let Some(value) = hit {
                return Ok(value);
            }
        }
        let raw = &slot.member.declaring.methods[slot.member.index];
        let result = if raw.modifiers.is_static {
            raw.call_ref(target, args)
        } else {
            slot.member
                .project_ref(target, &slot.member.declaring.name)
                .and_then(|receiver| raw.call_ref(receiver, args))
        };
        result.map_err(|e| ReflectError::from_core(&raw.name, &self.name, e))
    }

    /// Read the field at `index`, boxed
    pub fn get(&self, target: &dyn Any, index: usize) -> ReflectResult<Value> {
        let slot = self
            .get_slots
            .get(index)
            .ok_or_else(|| self.out_of_range(index))?;
        if let Some(fast) = &slot.fast {
            let hit = match fast {
                FastGetSlot::Bool(f) => f(target).map(Value::Bool),
                // the i64 channel carries i32 fields widened; re-narrow so
                // the boxed kind matches the fallback path exactly
                FastGetSlot::I64(f) => f(target).map(|v| match slot.declared_kind {
                    ValueKind::I32 => Value::I32(v as i32),
                    _ => Value::I64(v),
                }),
                FastGetSlot::F64(f) => f(target).map(Value::F64),
                FastGetSlot::Str(f) => f(target).map(Value::Str),
                FastGetSlot::Boxed(f) => f(target),
            };
            if let Some(value) = hit {
                return Ok(value);
            }
        }
        self.fallback_get(slot, target)
    }

    fn fallback_get(&self, slot: &GetSlot, target: &dyn Any) -> ReflectResult<Value> {
        let raw = &slot.member.declaring.fields[slot.member.index];
        let result = if raw.modifiers.is_static {
            (raw.get)(target)
        } else {
            slot.member
                .project_ref(target, &slot.member.declaring.name)
                .and_then(|receiver| (raw.get)(receiver))
        };
        result.map_err(|e| ReflectError::from_core(&raw.name, &self.name, e))
    }

    /// Read a boolean field without boxing
    pub fn get_bool(&self, target: &dyn Any, index: usize) -> ReflectResult<bool> {
        let slot = self
            .get_slots
            .get(index)
            .ok_or_else(|| self.out_of_range(index))?;
        if let Some(FastGetSlot::Bool(f)) = &slot.fast {
            if let Some(v) = f(target) {
                return Ok(v);
            }
        }
        let value = self.fallback_get(slot, target)?;
        value
            .as_bool()
            .ok_or_else(|| self.kind_mismatch(slot, "bool", &value))
    }

    /// Read an integer field without boxing (i32 fields widen)
    pub fn get_i64(&self, target: &dyn Any, index: usize) -> ReflectResult<i64> {
        let slot = self
            .get_slots
            .get(index)
            .ok_or_else(|| self.out_of_range(index))?;
        if let Some(FastGetSlot::I64(f)) = &slot.fast {
            if let Some(v) = f(target) {
                return Ok(v);
            }
        }
        let value = self.fallback_get(slot, target)?;
        value
            .as_i64()
            .ok_or_else(|| self.kind_mismatch(slot, "i64", &value))
    }

    /// Read a float field without boxing
    pub fn get_f64(&self, target: &dyn Any, index: usize) -> ReflectResult<f64> {
        let slot = self
            .get_slots
            .get(index)
            .ok_or_else(|| self.out_of_range(index))?;
        if let Some(FastGetSlot::F64(f)) = &slot.fast {
            if let Some(v) = f(target) {
                return Ok(v);
            }
        }
        let value = self.fallback_get(slot, target)?;
        value
            .as_f64()
            .ok_or_else(|| self.kind_mismatch(slot, "f64", &value))
    }

    fn kind_mismatch(&self, slot: &GetSlot, expected: &str, value: &Value) -> ReflectError {
        let raw = &slot.member.declaring.fields[slot.member.index];
        ReflectError::from_core(
            &raw.name,
            &self.name,
            CoreError::TypeMismatch {
                expected: expected.to_string(),
                got: value.kind().name().to_string(),
            },
        )
    }

    /// Write the field at `index`
    pub fn set(&self, target: &mut dyn Any, index: usize, value: &Value) -> ReflectResult<()> {
        let slot = self
            .set_slots
            .get(index)
            .ok_or_else(|| self.out_of_range(index))?;
        if let Some(fast) = &slot.fast {
            if fast(target, value).is_some() {
                return Ok(());
            }
        }
        let raw = &slot.member.declaring.fields[slot.member.index];
        let result = match &raw.set {
            None => Err(CoreError::ReadOnly {
                member: raw.name.clone(),
            }),
            Some(set) => {
                if raw.modifiers.is_static {
                    set(target, value)
                } else {
                    slot.member
                        .project_mut(target, &slot.member.declaring.name)
                        .and_then(|receiver| set(receiver, value))
                }
            }
        };
        result.map_err(|e| ReflectError::from_core(&raw.name, &self.name, e))
    }
}

impl std::fmt::Debug for AccessorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessorEngine")
            .field("type", &self.name)
            .field("policy", &self.policy)
            .field("get_slots", &self.get_slots.len())
            .field("invoke_slots", &self.invoke_slots.len())
            .field("construct_slots", &self.construct_slots.len())
            .finish()
    }
}
