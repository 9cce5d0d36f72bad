//! Stage reflection over a shader module AST.
//!
//! [`Reflector::register`] indexes every top-level declaration of a
//! module together with its direct named dependencies. A query then
//! computes the transitive closure for one pipeline stage and either
//! emits a minimal self-contained AST ([`Reflector::reflect`]) or a
//! structured description of the stage interface
//! ([`Reflector::reflection`]).
//!
//! The tables own deep copies of the registered declarations, so the
//! input AST can be dropped and queries can be repeated.

use hashbrown::{HashMap, HashSet};
use thiserror::Error;

use crate::ast::visit::{self, Visitor};
use crate::ast::{
    EntryFunctionDeclaration, Expression, ExternalDeclaration, ExternalVariable,
    FunctionCallExpression, FunctionDeclaration, InputDeclaration, OptionDeclaration,
    OutputDeclaration, SequenceStatement, ShaderStage, Statement, StructDeclaration, Type,
    VariableDeclaration, VariableExpression,
};
use crate::eval;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReflectError {
    #[error("{kind} `{name}` is already declared")]
    DuplicateDeclaration { kind: DeclarationKind, name: String },
    #[error("no entry function registered for stage {0:?}")]
    MissingEntryFunction(ShaderStage),
    #[error("`{name}` has a location, set or binding that does not reduce to an integral constant")]
    UnresolvableLocation { name: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    EntryFunction,
    Function,
    Struct,
    Variable,
    External,
}

impl std::fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EntryFunction => "entry function",
            Self::Function => "function",
            Self::Struct => "struct",
            Self::Variable => "variable",
            Self::External => "external",
        };
        f.write_str(name)
    }
}

/// Names a declaration depends on, split by declaration kind.
///
/// `variables` may also name externals; the distinction is resolved
/// when the closure is computed.
#[derive(Clone, Debug, Default)]
struct DependencySet {
    structs: HashSet<String>,
    variables: HashSet<String>,
    externals: HashSet<String>,
    functions: HashSet<String>,
}

#[derive(Debug, Default)]
struct EntryData {
    declaration: Option<EntryFunctionDeclaration>,
    inputs: Vec<InputDeclaration>,
    outputs: Vec<OutputDeclaration>,
    dependencies: DependencySet,
}

#[derive(Debug)]
struct StructData {
    declaration: StructDeclaration,
    dependencies: DependencySet,
    index: usize,
}

#[derive(Debug)]
struct FunctionData {
    declaration: FunctionDeclaration,
    dependencies: DependencySet,
    index: usize,
}

#[derive(Debug)]
struct VariableData {
    declaration: VariableDeclaration,
    dependencies: DependencySet,
    index: usize,
}

#[derive(Debug)]
struct ExternalData {
    variable: ExternalVariable,
    dependencies: DependencySet,
    index: usize,
}

/// The reflection record of one stage: its interface as seen by
/// pipeline and descriptor-set creation.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct StageReflection {
    pub inputs: Vec<ReflectedVariable>,
    pub outputs: Vec<ReflectedVariable>,
    pub externals: Vec<ReflectedExternal>,
    pub structs: Vec<ReflectedStruct>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReflectedVariable {
    pub name: String,
    pub ty: Type,
    pub location: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReflectedExternal {
    pub name: String,
    pub ty: Type,
    pub set: u32,
    pub binding: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReflectedStruct {
    pub name: String,
    pub members: Vec<ReflectedStructMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReflectedStructMember {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Default)]
pub struct Reflector {
    entries: HashMap<ShaderStage, EntryData>,
    structs: HashMap<String, StructData>,
    functions: HashMap<String, FunctionData>,
    variables: HashMap<String, VariableData>,
    externals: HashMap<String, ExternalData>,
    options: Vec<OptionDeclaration>,
    /// Registration counter; gives the emission a stable order.
    next_index: usize,
}

impl Reflector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `statement` and every declaration nested in sequences
    /// and optional blocks.
    pub fn register(&mut self, statement: &Statement) -> Result<(), ReflectError> {
        match statement {
            Statement::Sequence(sequence) => {
                for statement in &sequence.statements {
                    self.register(statement)?;
                }
                Ok(())
            }
            Statement::Optional(optional) => self.register(&optional.statement),
            Statement::EntryFunctionDeclaration(entry) => self.register_entry(entry),
            Statement::InputDeclaration(input) => {
                let data = self.entries.entry(input.stage).or_default();
                for variable in &input.variables {
                    collect_struct_type(&variable.ty, &mut data.dependencies);
                }
                data.inputs.push(input.clone());
                Ok(())
            }
            Statement::OutputDeclaration(output) => {
                let data = self.entries.entry(output.stage).or_default();
                for variable in &output.variables {
                    collect_struct_type(&variable.ty, &mut data.dependencies);
                }
                data.outputs.push(output.clone());
                Ok(())
            }
            Statement::ExternalDeclaration(external) => self.register_externals(external),
            Statement::OptionDeclaration(option) => {
                self.options.push(option.clone());
                Ok(())
            }
            Statement::StructDeclaration(declaration) => self.register_struct(declaration),
            Statement::FunctionDeclaration(declaration) => self.register_function(declaration),
            Statement::VariableDeclaration(declaration) => self.register_variable(declaration),
            // Includes are resolved before reflection; other statements
            // cannot appear at module scope.
            _ => Ok(()),
        }
    }

    /// Emits the minimal self-contained AST for `stage`.
    ///
    /// The emission order is: options, structs (dependencies first),
    /// one aggregated external block, module variables (dependencies
    /// first), the entry's inputs and outputs, functions (callees
    /// first), and finally the entry function.
    pub fn reflect(&self, stage: ShaderStage) -> Result<SequenceStatement, ReflectError> {
        let _span = tracing::trace_span!("Reflector::reflect", ?stage).entered();

        let entry = self.entry(stage)?;
        let closure = self.stage_dependencies(stage)?;

        let mut sequence = SequenceStatement::default();
        let mut emitter = Emitter {
            reflector: self,
            closure: &closure,
            emitted: HashSet::new(),
            statements: &mut sequence.statements,
        };

        for option in &self.options {
            emitter
                .statements
                .push(Statement::OptionDeclaration(option.clone()));
        }

        for name in sorted_by(&closure.structs, |name| self.structs[name].index) {
            emitter.add_struct(&name);
        }

        let mut externals = ExternalDeclaration::default();
        for name in sorted_by(&closure.externals, |name| self.externals[name].index) {
            externals.variables.push(self.externals[&name].variable.clone());
        }
        emitter
            .statements
            .push(Statement::ExternalDeclaration(externals));

        for name in sorted_by(&closure.variables, |name| self.variables[name].index) {
            emitter.add_variable(&name);
        }

        for input in &entry.inputs {
            emitter
                .statements
                .push(Statement::InputDeclaration(input.clone()));
        }

        for output in &entry.outputs {
            emitter
                .statements
                .push(Statement::OutputDeclaration(output.clone()));
        }

        for name in sorted_by(&closure.functions, |name| self.functions[name].index) {
            emitter.add_function(&name);
        }

        let declaration = entry.declaration.clone().unwrap();
        sequence
            .statements
            .push(Statement::EntryFunctionDeclaration(declaration));

        Ok(sequence)
    }

    /// Builds the [`StageReflection`] record for `stage`, evaluating
    /// every location, set and binding expression.
    pub fn reflection(&self, stage: ShaderStage) -> Result<StageReflection, ReflectError> {
        let _span = tracing::trace_span!("Reflector::reflection", ?stage).entered();

        let entry = self.entry(stage)?;
        let closure = self.stage_dependencies(stage)?;

        let mut reflection = StageReflection::default();

        for input in &entry.inputs {
            for variable in &input.variables {
                reflection.inputs.push(ReflectedVariable {
                    name: variable.name.clone(),
                    ty: variable.ty.clone(),
                    location: resolve_index(&variable.name, &variable.location)?,
                });
            }
        }

        for output in &entry.outputs {
            for variable in &output.variables {
                reflection.outputs.push(ReflectedVariable {
                    name: variable.name.clone(),
                    ty: variable.ty.clone(),
                    location: resolve_index(&variable.name, &variable.location)?,
                });
            }
        }

        for name in sorted_by(&closure.externals, |name| self.externals[name].index) {
            let variable = &self.externals[&name].variable;
            reflection.externals.push(ReflectedExternal {
                name: variable.name.clone(),
                ty: variable.ty.clone(),
                set: resolve_index(&variable.name, &variable.set_index)?,
                binding: resolve_index(&variable.name, &variable.binding_index)?,
            });
        }

        for name in sorted_by(&closure.structs, |name| self.structs[name].index) {
            let declaration = &self.structs[&name].declaration;
            reflection.structs.push(ReflectedStruct {
                name: declaration.name.clone(),
                members: declaration
                    .members
                    .iter()
                    .map(|member| ReflectedStructMember {
                        name: member.name.clone(),
                        ty: member.ty.clone(),
                    })
                    .collect(),
            });
        }

        Ok(reflection)
    }

    fn entry(&self, stage: ShaderStage) -> Result<&EntryData, ReflectError> {
        self.entries
            .get(&stage)
            .filter(|entry| entry.declaration.is_some())
            .ok_or(ReflectError::MissingEntryFunction(stage))
    }

    fn register_entry(&mut self, entry: &EntryFunctionDeclaration) -> Result<(), ReflectError> {
        let data = self.entries.entry(entry.stage).or_default();

        if data.declaration.is_some() {
            return Err(ReflectError::DuplicateDeclaration {
                kind: DeclarationKind::EntryFunction,
                name: entry.function.name.clone(),
            });
        }

        collect_struct_type(&entry.function.return_type, &mut data.dependencies);
        for argument in &entry.function.arguments {
            collect_struct_type(&argument.ty, &mut data.dependencies);
        }

        scan_dependencies(&entry.function.sequence, &mut data.dependencies);
        data.declaration = Some(entry.clone());

        Ok(())
    }

    fn register_externals(&mut self, external: &ExternalDeclaration) -> Result<(), ReflectError> {
        for variable in &external.variables {
            if self.externals.contains_key(&variable.name) {
                return Err(ReflectError::DuplicateDeclaration {
                    kind: DeclarationKind::External,
                    name: variable.name.clone(),
                });
            }

            let mut dependencies = DependencySet::default();
            collect_struct_type(&variable.ty, &mut dependencies);

            self.externals.insert(
                variable.name.clone(),
                ExternalData {
                    variable: variable.clone(),
                    dependencies,
                    index: self.next_index,
                },
            );
            self.next_index += 1;
        }

        Ok(())
    }

    fn register_struct(&mut self, declaration: &StructDeclaration) -> Result<(), ReflectError> {
        if self.structs.contains_key(&declaration.name) {
            return Err(ReflectError::DuplicateDeclaration {
                kind: DeclarationKind::Struct,
                name: declaration.name.clone(),
            });
        }

        let mut dependencies = DependencySet::default();
        for member in &declaration.members {
            collect_struct_type(&member.ty, &mut dependencies);
        }

        self.structs.insert(
            declaration.name.clone(),
            StructData {
                declaration: declaration.clone(),
                dependencies,
                index: self.next_index,
            },
        );
        self.next_index += 1;

        Ok(())
    }

    fn register_function(&mut self, declaration: &FunctionDeclaration) -> Result<(), ReflectError> {
        if self.functions.contains_key(&declaration.name) {
            return Err(ReflectError::DuplicateDeclaration {
                kind: DeclarationKind::Function,
                name: declaration.name.clone(),
            });
        }

        let mut dependencies = DependencySet::default();
        collect_struct_type(&declaration.return_type, &mut dependencies);
        for argument in &declaration.arguments {
            collect_struct_type(&argument.ty, &mut dependencies);
        }
        scan_dependencies(&declaration.sequence, &mut dependencies);

        self.functions.insert(
            declaration.name.clone(),
            FunctionData {
                declaration: declaration.clone(),
                dependencies,
                index: self.next_index,
            },
        );
        self.next_index += 1;

        Ok(())
    }

    fn register_variable(&mut self, declaration: &VariableDeclaration) -> Result<(), ReflectError> {
        if self.variables.contains_key(&declaration.name) {
            return Err(ReflectError::DuplicateDeclaration {
                kind: DeclarationKind::Variable,
                name: declaration.name.clone(),
            });
        }

        let mut dependencies = DependencySet::default();
        collect_struct_type(&declaration.ty, &mut dependencies);
        if let Some(value) = &declaration.value {
            let mut scanner = DependencyScanner {
                dependencies: &mut dependencies,
            };
            scanner.visit_expression(value);
        }

        self.variables.insert(
            declaration.name.clone(),
            VariableData {
                declaration: declaration.clone(),
                dependencies,
                index: self.next_index,
            },
        );
        self.next_index += 1;

        Ok(())
    }

    /// Transitive closure of the entry's direct dependencies.
    ///
    /// Variable names that resolve to externals promote into the
    /// external set; struct types of included variables are pulled in.
    /// Names that resolve to nothing are silently dropped (built-ins
    /// and entry arguments fall through here).
    fn stage_dependencies(&self, stage: ShaderStage) -> Result<DependencySet, ReflectError> {
        let entry = self.entry(stage)?;

        let mut closure = DependencySet::default();
        self.resolve(&entry.dependencies, &mut closure);
        Ok(closure)
    }

    fn resolve(&self, dependencies: &DependencySet, closure: &mut DependencySet) {
        for name in &dependencies.structs {
            self.resolve_struct(name, closure);
        }

        for name in &dependencies.variables {
            if let Some(data) = self.variables.get(name) {
                if closure.variables.insert(name.clone()) {
                    self.resolve(&data.dependencies, closure);

                    if let Some(struct_name) = data.declaration.ty.struct_name() {
                        self.resolve_struct(struct_name, closure);
                    }
                }
            } else if self.externals.contains_key(name) {
                self.resolve_external(name, closure);
            }
        }

        for name in &dependencies.externals {
            self.resolve_external(name, closure);
        }

        for name in &dependencies.functions {
            if let Some(data) = self.functions.get(name) {
                if closure.functions.insert(name.clone()) {
                    self.resolve(&data.dependencies, closure);
                }
            }
        }
    }

    fn resolve_struct(&self, name: &str, closure: &mut DependencySet) {
        if let Some(data) = self.structs.get(name) {
            if closure.structs.insert(name.to_owned()) {
                self.resolve(&data.dependencies, closure);
            }
        }
    }

    fn resolve_external(&self, name: &str, closure: &mut DependencySet) {
        if let Some(data) = self.externals.get(name) {
            if closure.externals.insert(name.to_owned()) {
                self.resolve(&data.dependencies, closure);
            }
        }
    }
}

/// Emission state of one `reflect` query: what was already pushed, so
/// each declaration appears at most once.
struct Emitter<'a> {
    reflector: &'a Reflector,
    closure: &'a DependencySet,
    emitted: HashSet<String>,
    statements: &'a mut Vec<Statement>,
}

impl Emitter<'_> {
    fn registration_index(&self, name: &str) -> usize {
        if let Some(data) = self.reflector.structs.get(name) {
            data.index
        } else if let Some(data) = self.reflector.functions.get(name) {
            data.index
        } else if let Some(data) = self.reflector.variables.get(name) {
            data.index
        } else if let Some(data) = self.reflector.externals.get(name) {
            data.index
        } else {
            usize::MAX
        }
    }

    fn add_struct(&mut self, name: &str) {
        if !self.closure.structs.contains(name) || !self.emitted.insert(format!("struct:{name}")) {
            return;
        }

        let dependencies = sorted_by(
            &self.reflector.structs[name].dependencies.structs,
            |n| self.registration_index(n),
        );
        for dependency in dependencies {
            self.add_struct(&dependency);
        }

        self.statements.push(Statement::StructDeclaration(
            self.reflector.structs[name].declaration.clone(),
        ));
    }

    fn add_variable(&mut self, name: &str) {
        if !self.closure.variables.contains(name) || !self.emitted.insert(format!("var:{name}")) {
            return;
        }

        let dependencies = sorted_by(
            &self.reflector.variables[name].dependencies.variables,
            |n| self.registration_index(n),
        );
        for dependency in dependencies {
            self.add_variable(&dependency);
        }

        self.statements.push(Statement::VariableDeclaration(
            self.reflector.variables[name].declaration.clone(),
        ));
    }

    fn add_function(&mut self, name: &str) {
        if !self.closure.functions.contains(name) || !self.emitted.insert(format!("fn:{name}")) {
            return;
        }

        let dependencies = sorted_by(
            &self.reflector.functions[name].dependencies.functions,
            |n| self.registration_index(n),
        );
        for dependency in dependencies {
            self.add_function(&dependency);
        }

        self.statements.push(Statement::FunctionDeclaration(
            self.reflector.functions[name].declaration.clone(),
        ));
    }
}

/// Set iteration order is unspecified; sort names by registration index
/// so two identical modules reflect identically.
fn sorted_by<F>(names: &HashSet<String>, index: F) -> Vec<String>
where
    F: Fn(&str) -> usize,
{
    let mut names: Vec<_> = names.iter().cloned().collect();
    names.sort_by_key(|name| index(name));
    names
}

fn resolve_index(name: &str, expression: &Expression) -> Result<u32, ReflectError> {
    eval::evaluate_u32(expression).ok_or_else(|| ReflectError::UnresolvableLocation {
        name: name.to_owned(),
    })
}

fn collect_struct_type(ty: &Type, dependencies: &mut DependencySet) {
    if let Some(name) = ty.struct_name() {
        dependencies.structs.insert(name.to_owned());
    }
}

fn scan_dependencies(sequence: &SequenceStatement, dependencies: &mut DependencySet) {
    let mut scanner = DependencyScanner { dependencies };
    scanner.visit_sequence(sequence);
}

/// Collects the names a function or entry body refers to: variable
/// reads, function calls and the struct types of local declarations.
struct DependencyScanner<'a> {
    dependencies: &'a mut DependencySet,
}

impl Visitor for DependencyScanner<'_> {
    fn visit_variable_expression(&mut self, expression: &VariableExpression) {
        self.dependencies
            .variables
            .insert(expression.identifier.clone());
    }

    fn visit_function_call(&mut self, expression: &FunctionCallExpression) {
        self.dependencies
            .functions
            .insert(expression.identifier.clone());
        visit::walk_function_call(self, expression);
    }

    fn visit_variable_declaration(&mut self, statement: &VariableDeclaration) {
        collect_struct_type(&statement.ty, self.dependencies);
        visit::walk_variable_declaration(self, statement);
    }
}

#[cfg(test)]
mod tests {
    use super::{DeclarationKind, ReflectError, Reflector};
    use crate::ast::{
        AccessIdentifierExpression, BinaryExpression, BinaryOperator, BuiltInFunction,
        BuiltInFunctionCallExpression, EntryFunctionDeclaration, Expression, ExpressionStatement,
        ExternalDeclaration, ExternalVariable, FunctionArgument, FunctionCallExpression,
        FunctionDeclaration, InOutVariable, InputDeclaration, MemoryLayout, OptionDeclaration,
        OptionVariable, PrimitiveType, ReturnStatement, SamplerDimension, SequenceStatement,
        ShaderStage, Statement, StructDeclaration, StructMember, Type, VariableDeclaration,
        VariableQualifiers,
    };

    fn float() -> Type {
        Type::Primitive(PrimitiveType::Float)
    }

    fn vec3f() -> Type {
        Type::Vector {
            component: PrimitiveType::Float,
            len: 3,
        }
    }

    fn external_variable(name: &str, ty: Type, set: u32, binding: u32) -> ExternalVariable {
        ExternalVariable {
            name: name.to_owned(),
            ty,
            set_index: Expression::constant(set),
            binding_index: Expression::constant(binding),
            layout: MemoryLayout::default(),
            condition: None,
        }
    }

    fn function(name: &str, body: Vec<Statement>) -> FunctionDeclaration {
        FunctionDeclaration {
            name: name.to_owned(),
            return_type: float(),
            arguments: vec![FunctionArgument {
                name: "x".to_owned(),
                ty: float(),
            }],
            sequence: SequenceStatement { statements: body },
        }
    }

    fn call(name: &str, arguments: Vec<Expression>) -> Expression {
        Expression::FunctionCall(FunctionCallExpression {
            identifier: name.to_owned(),
            arguments,
        })
    }

    fn member_access(base: &str, member: &str) -> Expression {
        Expression::AccessIdentifier(AccessIdentifierExpression {
            expression: Box::new(Expression::variable(base)),
            identifier: member.to_owned(),
        })
    }

    /// The S5 module: an option, a struct, two externals, a helper and
    /// a fragment entry using all of them.
    fn fragment_module() -> Statement {
        let helper = function(
            "helper",
            vec![Statement::Return(ReturnStatement {
                expression: Some(Expression::Binary(BinaryExpression {
                    operator: BinaryOperator::Multiply,
                    left: Box::new(Expression::variable("x")),
                    right: Box::new(Expression::variable("x")),
                })),
            })],
        );

        let entry = EntryFunctionDeclaration {
            stage: ShaderStage::Fragment,
            function: FunctionDeclaration {
                name: "main".to_owned(),
                return_type: Type::Void,
                arguments: Vec::new(),
                sequence: SequenceStatement {
                    statements: vec![
                        Statement::VariableDeclaration(VariableDeclaration {
                            name: "value".to_owned(),
                            qualifiers: VariableQualifiers::empty(),
                            ty: float(),
                            value: Some(call("helper", vec![member_access("u", "a")])),
                        }),
                        Statement::Expression(ExpressionStatement {
                            expression: Expression::BuiltInFunctionCall(
                                BuiltInFunctionCallExpression {
                                    function: BuiltInFunction::Sample,
                                    arguments: vec![Expression::variable("tex")],
                                },
                            ),
                        }),
                    ],
                },
            },
        };

        Statement::Sequence(SequenceStatement {
            statements: vec![
                Statement::OptionDeclaration(OptionDeclaration {
                    variables: vec![OptionVariable {
                        name: "FLAG".to_owned(),
                        ty: Type::Primitive(PrimitiveType::Bool),
                        value: Some(Expression::constant(false)),
                    }],
                }),
                Statement::StructDeclaration(StructDeclaration {
                    name: "S".to_owned(),
                    members: vec![
                        StructMember {
                            name: "a".to_owned(),
                            ty: float(),
                            condition: None,
                        },
                        StructMember {
                            name: "b".to_owned(),
                            ty: vec3f(),
                            condition: None,
                        },
                    ],
                }),
                Statement::ExternalDeclaration(ExternalDeclaration {
                    variables: vec![
                        external_variable("u", Type::Struct("S".to_owned()), 0, 1),
                        external_variable(
                            "tex",
                            Type::Sampler {
                                dimension: SamplerDimension::Texture2D,
                                component: PrimitiveType::Float,
                            },
                            0,
                            2,
                        ),
                    ],
                }),
                Statement::FunctionDeclaration(helper),
                Statement::EntryFunctionDeclaration(entry),
            ],
        })
    }

    fn kinds(sequence: &SequenceStatement) -> Vec<&'static str> {
        sequence
            .statements
            .iter()
            .map(|statement| match statement {
                Statement::OptionDeclaration(_) => "option",
                Statement::StructDeclaration(_) => "struct",
                Statement::ExternalDeclaration(_) => "external",
                Statement::VariableDeclaration(_) => "variable",
                Statement::InputDeclaration(_) => "input",
                Statement::OutputDeclaration(_) => "output",
                Statement::FunctionDeclaration(_) => "function",
                Statement::EntryFunctionDeclaration(_) => "entry",
                _ => "other",
            })
            .collect()
    }

    #[test]
    fn fragment_stage_emission_order() {
        let mut reflector = Reflector::new();
        reflector.register(&fragment_module()).unwrap();

        let sequence = reflector.reflect(ShaderStage::Fragment).unwrap();
        assert_eq!(
            kinds(&sequence),
            ["option", "struct", "external", "function", "entry"],
        );

        // Both externals survive: `u` through the variable reference in
        // `helper(u.a)`, `tex` through the sample call.
        let Statement::ExternalDeclaration(externals) = &sequence.statements[2] else {
            unreachable!();
        };
        let mut names: Vec<_> = externals
            .variables
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        names.sort_unstable();
        assert_eq!(names, ["tex", "u"]);

        let entries: Vec<_> = sequence
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::EntryFunctionDeclaration(entry) => Some(entry),
                _ => None,
            })
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stage, ShaderStage::Fragment);
    }

    #[test]
    fn reflect_is_minimal() {
        let mut reflector = Reflector::new();
        reflector.register(&fragment_module()).unwrap();
        reflector
            .register(&Statement::StructDeclaration(StructDeclaration {
                name: "Unused".to_owned(),
                members: Vec::new(),
            }))
            .unwrap();
        reflector
            .register(&Statement::FunctionDeclaration(function(
                "unused",
                Vec::new(),
            )))
            .unwrap();

        let sequence = reflector.reflect(ShaderStage::Fragment).unwrap();
        for statement in &sequence.statements {
            match statement {
                Statement::StructDeclaration(declaration) => {
                    assert_ne!(declaration.name, "Unused");
                }
                Statement::FunctionDeclaration(declaration) => {
                    assert_ne!(declaration.name, "unused");
                }
                _ => (),
            }
        }
    }

    #[test]
    fn structs_are_emitted_after_their_dependencies() {
        let mut reflector = Reflector::new();

        // Outer is declared first and refers to Inner.
        reflector
            .register(&Statement::StructDeclaration(StructDeclaration {
                name: "Outer".to_owned(),
                members: vec![StructMember {
                    name: "inner".to_owned(),
                    ty: Type::Struct("Inner".to_owned()),
                    condition: None,
                }],
            }))
            .unwrap();
        reflector
            .register(&Statement::StructDeclaration(StructDeclaration {
                name: "Inner".to_owned(),
                members: vec![StructMember {
                    name: "value".to_owned(),
                    ty: float(),
                    condition: None,
                }],
            }))
            .unwrap();
        reflector
            .register(&Statement::EntryFunctionDeclaration(
                EntryFunctionDeclaration {
                    stage: ShaderStage::Vertex,
                    function: FunctionDeclaration {
                        name: "main".to_owned(),
                        return_type: Type::Void,
                        arguments: Vec::new(),
                        sequence: SequenceStatement {
                            statements: vec![Statement::VariableDeclaration(
                                VariableDeclaration {
                                    name: "value".to_owned(),
                                    qualifiers: VariableQualifiers::empty(),
                                    ty: Type::Struct("Outer".to_owned()),
                                    value: None,
                                },
                            )],
                        },
                    },
                },
            ))
            .unwrap();

        let sequence = reflector.reflect(ShaderStage::Vertex).unwrap();
        let structs: Vec<_> = sequence
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::StructDeclaration(declaration) => Some(declaration.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(structs, ["Inner", "Outer"]);
    }

    #[test]
    fn functions_are_emitted_after_their_callees() {
        let mut reflector = Reflector::new();

        // `outer` is declared first and forward-calls `leaf`.
        reflector
            .register(&Statement::FunctionDeclaration(function(
                "outer",
                vec![Statement::Return(ReturnStatement {
                    expression: Some(call("leaf", vec![Expression::variable("x")])),
                })],
            )))
            .unwrap();
        reflector
            .register(&Statement::FunctionDeclaration(function(
                "leaf",
                vec![Statement::Return(ReturnStatement {
                    expression: Some(Expression::variable("x")),
                })],
            )))
            .unwrap();
        reflector
            .register(&Statement::EntryFunctionDeclaration(
                EntryFunctionDeclaration {
                    stage: ShaderStage::Vertex,
                    function: FunctionDeclaration {
                        name: "main".to_owned(),
                        return_type: Type::Void,
                        arguments: Vec::new(),
                        sequence: SequenceStatement {
                            statements: vec![Statement::Expression(ExpressionStatement {
                                expression: call("outer", vec![Expression::constant(1.0_f32)]),
                            })],
                        },
                    },
                },
            ))
            .unwrap();

        let sequence = reflector.reflect(ShaderStage::Vertex).unwrap();
        let functions: Vec<_> = sequence
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::FunctionDeclaration(declaration) => Some(declaration.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(functions, ["leaf", "outer"]);
    }

    #[test]
    fn module_variables_are_included_and_promoted() {
        let mut reflector = Reflector::new();

        reflector
            .register(&Statement::VariableDeclaration(VariableDeclaration {
                name: "gamma".to_owned(),
                qualifiers: VariableQualifiers::CONST,
                ty: float(),
                value: Some(Expression::constant(2.2_f32)),
            }))
            .unwrap();
        reflector
            .register(&Statement::EntryFunctionDeclaration(
                EntryFunctionDeclaration {
                    stage: ShaderStage::Fragment,
                    function: FunctionDeclaration {
                        name: "main".to_owned(),
                        return_type: Type::Void,
                        arguments: Vec::new(),
                        sequence: SequenceStatement {
                            statements: vec![Statement::Expression(ExpressionStatement {
                                expression: Expression::variable("gamma"),
                            })],
                        },
                    },
                },
            ))
            .unwrap();

        let sequence = reflector.reflect(ShaderStage::Fragment).unwrap();
        assert_eq!(kinds(&sequence), ["external", "variable", "entry"]);
    }

    #[test]
    fn input_locations_are_evaluated() {
        let mut reflector = Reflector::new();

        // [location(2 + 1)] in vec3f pos — registered before the entry.
        reflector
            .register(&Statement::InputDeclaration(InputDeclaration {
                stage: ShaderStage::Vertex,
                variables: vec![InOutVariable {
                    name: "pos".to_owned(),
                    ty: vec3f(),
                    location: Expression::Binary(BinaryExpression {
                        operator: BinaryOperator::Add,
                        left: Box::new(Expression::constant(2_i32)),
                        right: Box::new(Expression::constant(1_i32)),
                    }),
                    condition: None,
                }],
            }))
            .unwrap();
        reflector
            .register(&Statement::EntryFunctionDeclaration(
                EntryFunctionDeclaration {
                    stage: ShaderStage::Vertex,
                    function: FunctionDeclaration {
                        name: "main".to_owned(),
                        return_type: Type::Void,
                        arguments: Vec::new(),
                        sequence: SequenceStatement::default(),
                    },
                },
            ))
            .unwrap();

        let reflection = reflector.reflection(ShaderStage::Vertex).unwrap();
        assert_eq!(reflection.inputs.len(), 1);
        assert_eq!(reflection.inputs[0].name, "pos");
        assert_eq!(reflection.inputs[0].ty, vec3f());
        assert_eq!(reflection.inputs[0].location, 3);
    }

    #[test]
    fn runtime_location_fails_reflection() {
        let mut reflector = Reflector::new();

        reflector
            .register(&Statement::InputDeclaration(InputDeclaration {
                stage: ShaderStage::Vertex,
                variables: vec![InOutVariable {
                    name: "pos".to_owned(),
                    ty: vec3f(),
                    location: Expression::variable("someRuntimeExpr"),
                    condition: None,
                }],
            }))
            .unwrap();
        reflector
            .register(&Statement::EntryFunctionDeclaration(
                EntryFunctionDeclaration {
                    stage: ShaderStage::Vertex,
                    function: FunctionDeclaration {
                        name: "main".to_owned(),
                        return_type: Type::Void,
                        arguments: Vec::new(),
                        sequence: SequenceStatement::default(),
                    },
                },
            ))
            .unwrap();

        assert_eq!(
            reflector.reflection(ShaderStage::Vertex),
            Err(ReflectError::UnresolvableLocation {
                name: "pos".to_owned(),
            }),
        );
    }

    #[test]
    fn external_sets_and_bindings_are_evaluated() {
        let mut reflector = Reflector::new();
        reflector.register(&fragment_module()).unwrap();

        let reflection = reflector.reflection(ShaderStage::Fragment).unwrap();
        let u = reflection
            .externals
            .iter()
            .find(|external| external.name == "u")
            .unwrap();
        assert_eq!((u.set, u.binding), (0, 1));
        assert_eq!(reflection.structs.len(), 1);
        assert_eq!(reflection.structs[0].name, "S");
        assert_eq!(reflection.structs[0].members.len(), 2);
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let declaration = Statement::StructDeclaration(StructDeclaration {
            name: "S".to_owned(),
            members: Vec::new(),
        });

        let mut reflector = Reflector::new();
        reflector.register(&declaration).unwrap();
        assert_eq!(
            reflector.register(&declaration),
            Err(ReflectError::DuplicateDeclaration {
                kind: DeclarationKind::Struct,
                name: "S".to_owned(),
            }),
        );
    }

    #[test]
    fn duplicate_entry_for_stage_is_rejected() {
        let entry = Statement::EntryFunctionDeclaration(EntryFunctionDeclaration {
            stage: ShaderStage::Compute,
            function: FunctionDeclaration {
                name: "main".to_owned(),
                return_type: Type::Void,
                arguments: Vec::new(),
                sequence: SequenceStatement::default(),
            },
        });

        let mut reflector = Reflector::new();
        reflector.register(&entry).unwrap();
        assert!(matches!(
            reflector.register(&entry),
            Err(ReflectError::DuplicateDeclaration {
                kind: DeclarationKind::EntryFunction,
                ..
            }),
        ));
    }

    #[test]
    fn missing_entry_is_reported() {
        let reflector = Reflector::new();
        assert_eq!(
            reflector.reflect(ShaderStage::Geometry).err(),
            Some(ReflectError::MissingEntryFunction(ShaderStage::Geometry)),
        );
    }

    #[test]
    fn queries_can_repeat() {
        let mut reflector = Reflector::new();
        reflector.register(&fragment_module()).unwrap();

        let first = reflector.reflect(ShaderStage::Fragment).unwrap();
        let second = reflector.reflect(ShaderStage::Fragment).unwrap();
        assert_eq!(first, second);
    }
}
