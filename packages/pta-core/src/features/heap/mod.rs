//! Heap abstraction
//!
//! Maps allocation sites to abstract objects. One object per syntactic
//! `new` by default; the merge policies collapse high-volume types
//! (string constants, mutable string buffers, throwables) into a single
//! representative per type, trading precision for scalability. Merged,
//! constant and environment objects are "special": they never receive a
//! heap context.
//!
//! Well-known type names follow the consumed class universe:
//! `java.lang.String`, `java.lang.StringBuilder`, `java.lang.StringBuffer`,
//! `java.lang.Throwable`. Programs that do not declare them simply have
//! the corresponding policies apply to nothing.

use crate::config::AnalysisOptions;
use crate::shared::hierarchy::ClassHierarchy;
use crate::shared::ir::{AllocSiteId, MethodId, Program, TypeId};
use rustc_hash::FxHashMap;

pub const STRING: &str = "java.lang.String";
pub const STRING_BUILDER: &str = "java.lang.StringBuilder";
pub const STRING_BUFFER: &str = "java.lang.StringBuffer";
pub const THROWABLE: &str = "java.lang.Throwable";

/// Abstract object id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u32);

/// Kinds of abstract objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjKind {
    /// One object per allocation site
    Alloc(AllocSiteId),
    /// String-literal constant
    Constant(String),
    /// Representative for a merge-policy group; keeps the objects it
    /// stands for, for diagnostics
    Merged { represented: Vec<ObjId> },
    /// Environment object created outside the analyzed code (e.g. the
    /// implicit main thread), installed by plugins
    Environment(String),
}

#[derive(Debug, Clone)]
pub struct ObjData {
    pub kind: ObjKind,
    pub ty: TypeId,
    /// Method containing the allocation, for allocation-site objects
    pub container: Option<MethodId>,
}

/// The configurable heap model.
#[derive(Debug)]
pub struct HeapModel {
    merge_string_constants: bool,
    merge_string_builders: bool,
    merge_exception_objects: bool,

    string_ty: Option<TypeId>,
    builder_tys: Vec<TypeId>,
    throwable_ty: Option<TypeId>,

    objs: Vec<ObjData>,
    alloc_index: FxHashMap<AllocSiteId, ObjId>,
    constant_index: FxHashMap<String, ObjId>,
    merged_index: FxHashMap<TypeId, ObjId>,
    environment_index: FxHashMap<String, ObjId>,
    /// Representative for all merged string constants
    merged_string_constants: Option<ObjId>,
}

impl HeapModel {
    pub fn new(program: &Program, options: &AnalysisOptions) -> Self {
        let class_ty = |name: &str| program.class_by_name(name).map(|c| program.class(c).ty);
        Self {
            merge_string_constants: options.merge_string_constants,
            merge_string_builders: options.merge_string_builders,
            merge_exception_objects: options.merge_exception_objects,
            string_ty: class_ty(STRING),
            builder_tys: [STRING_BUILDER, STRING_BUFFER]
                .into_iter()
                .filter_map(class_ty)
                .collect(),
            throwable_ty: class_ty(THROWABLE),
            objs: Vec::new(),
            alloc_index: FxHashMap::default(),
            constant_index: FxHashMap::default(),
            merged_index: FxHashMap::default(),
            environment_index: FxHashMap::default(),
            merged_string_constants: None,
        }
    }

    /// Abstract object for an allocation site, applying merge policies.
    pub fn get_obj(&mut self, program: &Program, site: AllocSiteId) -> ObjId {
        let ty = program.alloc_site(site).ty;
        if self.merge_string_builders && self.builder_tys.contains(&ty) {
            return self.get_merged_obj(program, site, ty);
        }
        if self.merge_exception_objects {
            let hierarchy = ClassHierarchy::new(program);
            if let Some(throwable) = self.throwable_ty {
                if hierarchy.is_subtype(throwable, ty) {
                    return self.get_merged_obj(program, site, ty);
                }
            }
        }
        self.get_alloc_obj(program, site)
    }

    /// Abstract object for a string-literal constant. `None` if the
    /// program declares no string class for literals to have a type.
    pub fn get_constant_obj(&mut self, literal: &str) -> Option<ObjId> {
        let string_ty = self.string_ty?;
        let obj = match self.constant_index.get(literal) {
            Some(obj) => *obj,
            None => {
                let obj = self.push(ObjData {
                    kind: ObjKind::Constant(literal.to_string()),
                    ty: string_ty,
                    container: None,
                });
                self.constant_index.insert(literal.to_string(), obj);
                obj
            }
        };
        if self.merge_string_constants {
            let merged = match self.merged_string_constants {
                Some(merged) => merged,
                None => {
                    let merged = self.push(ObjData {
                        kind: ObjKind::Merged { represented: Vec::new() },
                        ty: string_ty,
                        container: None,
                    });
                    self.merged_string_constants = Some(merged);
                    merged
                }
            };
            self.add_represented(merged, obj);
            return Some(merged);
        }
        Some(obj)
    }

    /// Environment object interned by name, for plugin-installed objects.
    pub fn get_environment_obj(&mut self, name: &str, ty: TypeId) -> ObjId {
        if let Some(obj) = self.environment_index.get(name) {
            return *obj;
        }
        let obj = self.push(ObjData {
            kind: ObjKind::Environment(name.to_string()),
            ty,
            container: None,
        });
        self.environment_index.insert(name.to_string(), obj);
        obj
    }

    fn get_alloc_obj(&mut self, program: &Program, site: AllocSiteId) -> ObjId {
        if let Some(obj) = self.alloc_index.get(&site) {
            return *obj;
        }
        let data = program.alloc_site(site);
        let obj = self.push(ObjData {
            kind: ObjKind::Alloc(site),
            ty: data.ty,
            container: Some(data.container),
        });
        self.alloc_index.insert(site, obj);
        obj
    }

    fn get_merged_obj(&mut self, program: &Program, site: AllocSiteId, ty: TypeId) -> ObjId {
        let merged = match self.merged_index.get(&ty) {
            Some(merged) => *merged,
            None => {
                let merged = self.push(ObjData {
                    kind: ObjKind::Merged { represented: Vec::new() },
                    ty,
                    container: None,
                });
                self.merged_index.insert(ty, merged);
                merged
            }
        };
        let site_obj = self.get_alloc_obj(program, site);
        self.add_represented(merged, site_obj);
        merged
    }

    fn add_represented(&mut self, merged: ObjId, obj: ObjId) {
        if let ObjKind::Merged { represented } = &mut self.objs[merged.0 as usize].kind {
            if !represented.contains(&obj) {
                represented.push(obj);
            }
        }
    }

    fn push(&mut self, data: ObjData) -> ObjId {
        let obj = ObjId(self.objs.len() as u32);
        self.objs.push(data);
        obj
    }

    pub fn obj(&self, obj: ObjId) -> &ObjData {
        &self.objs[obj.0 as usize]
    }

    /// Whether the object opts out of heap-context sensitivity.
    pub fn is_special(&self, obj: ObjId) -> bool {
        !matches!(self.obj(obj).kind, ObjKind::Alloc(_))
    }

    /// Context element source for type sensitivity: the type containing
    /// the object's allocation, falling back to the object's own type.
    pub fn container_type(&self, program: &Program, obj: ObjId) -> TypeId {
        let data = self.obj(obj);
        match data.container {
            Some(method) => program.class(program.method(method).owner).ty,
            None => data.ty,
        }
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjId, &ObjData)> {
        self.objs
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjId(i as u32), o))
    }

    /// Diagnostic name for an object.
    pub fn describe(&self, program: &Program, obj: ObjId) -> String {
        let data = self.obj(obj);
        match &data.kind {
            ObjKind::Alloc(site) => {
                format!("new {}/{}", program.type_name(data.ty), site.0)
            }
            ObjKind::Constant(literal) => format!("\"{literal}\""),
            ObjKind::Merged { .. } => format!("<Merged {}>", program.type_name(data.ty)),
            ObjKind::Environment(name) => format!("<{name}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ir::ProgramBuilder;

    fn string_program() -> (Program, MethodId) {
        let mut b = ProgramBuilder::new();
        let object = b.class("Object", None);
        b.class(STRING, Some(object));
        b.class(STRING_BUILDER, Some(object));
        let main_class = b.class("Main", Some(object));
        let main = b.method(main_class, "main()", true);
        (b.build(), main)
    }

    #[test]
    fn test_stable_obj_per_alloc_site() {
        let mut b = ProgramBuilder::new();
        let object = b.class("Object", None);
        let ty = b.class_type(object);
        let main_class = b.class("Main", Some(object));
        let main = b.method(main_class, "main()", true);
        let s1 = b.alloc_site(main, ty);
        let s2 = b.alloc_site(main, ty);
        let program = b.build();

        let mut heap = HeapModel::new(&program, &AnalysisOptions::default());
        let o1 = heap.get_obj(&program, s1);
        assert_eq!(o1, heap.get_obj(&program, s1));
        assert_ne!(o1, heap.get_obj(&program, s2));
    }

    #[test]
    fn test_string_constant_merge_toggle() {
        let (program, _main) = string_program();

        let mut merged = HeapModel::new(
            &program,
            &AnalysisOptions {
                merge_string_constants: true,
                ..Default::default()
            },
        );
        let a = merged.get_constant_obj("a").unwrap();
        let b = merged.get_constant_obj("b").unwrap();
        assert_eq!(a, b);
        assert!(merged.is_special(a));
        if let ObjKind::Merged { represented } = &merged.obj(a).kind {
            assert_eq!(represented.len(), 2);
        } else {
            panic!("expected merged representative");
        }

        let mut unmerged = HeapModel::new(&program, &AnalysisOptions::default());
        let a = unmerged.get_constant_obj("a").unwrap();
        let b = unmerged.get_constant_obj("b").unwrap();
        assert_ne!(a, b);
        // The same literal still interns to one object
        assert_eq!(a, unmerged.get_constant_obj("a").unwrap());
    }

    #[test]
    fn test_string_builder_merge_by_type() {
        let mut b = ProgramBuilder::new();
        let object = b.class("Object", None);
        b.class(STRING, Some(object));
        let sb = b.class(STRING_BUILDER, Some(object));
        let sb_ty = b.class_type(sb);
        let main_class = b.class("Main", Some(object));
        let main = b.method(main_class, "main()", true);
        let s1 = b.alloc_site(main, sb_ty);
        let s2 = b.alloc_site(main, sb_ty);
        let program = b.build();

        let mut heap = HeapModel::new(
            &program,
            &AnalysisOptions {
                merge_string_builders: true,
                ..Default::default()
            },
        );
        let o1 = heap.get_obj(&program, s1);
        let o2 = heap.get_obj(&program, s2);
        assert_eq!(o1, o2);
        assert!(heap.is_special(o1));
    }

    #[test]
    fn test_environment_obj_interned() {
        let (program, _main) = string_program();
        let ty = program.class(program.class_by_name("Object").unwrap()).ty;
        let mut heap = HeapModel::new(&program, &AnalysisOptions::default());
        let t1 = heap.get_environment_obj("main-thread", ty);
        let t2 = heap.get_environment_obj("main-thread", ty);
        assert_eq!(t1, t2);
        assert!(heap.is_special(t1));
    }
}
