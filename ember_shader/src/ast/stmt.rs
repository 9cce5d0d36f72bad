use bitflags::bitflags;

use super::{Expression, ShaderStage, Type};

/// A statement node.
///
/// Variants wrap one payload struct each, mirroring [`Expression`].
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Conditional(ConditionalStatement),
    ForLoop(ForLoopStatement),
    WhileLoop(WhileLoopStatement),
    DoWhileLoop(DoWhileLoopStatement),
    VariableDeclaration(VariableDeclaration),
    StructDeclaration(StructDeclaration),
    InputDeclaration(InputDeclaration),
    OutputDeclaration(OutputDeclaration),
    ExternalDeclaration(ExternalDeclaration),
    OptionDeclaration(OptionDeclaration),
    FunctionDeclaration(FunctionDeclaration),
    EntryFunctionDeclaration(EntryFunctionDeclaration),
    Expression(ExpressionStatement),
    Break,
    Continue,
    Return(ReturnStatement),
    Discard,
    Sequence(SequenceStatement),
    Optional(OptionalStatement),
    Include(IncludeStatement),
}

/// An `if`/`else if`/`else` chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionalStatement {
    pub branches: Vec<ConditionalBranch>,
    pub else_statement: Option<Box<Statement>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConditionalBranch {
    pub condition: Expression,
    pub statement: Statement,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForLoopStatement {
    pub initialization: Option<Box<Statement>>,
    pub condition: Option<Expression>,
    pub increase: Option<Expression>,
    pub statement: Box<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileLoopStatement {
    pub condition: Expression,
    pub statement: Box<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DoWhileLoopStatement {
    pub condition: Expression,
    pub statement: Box<Statement>,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct VariableQualifiers: u32 {
        const CONST = 1 << 0;
    }
}

/// A local or module-level variable declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDeclaration {
    pub name: String,
    pub qualifiers: VariableQualifiers,
    pub ty: Type,
    pub value: Option<Expression>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructDeclaration {
    pub name: String,
    pub members: Vec<StructMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
    /// When present, the member only exists if the option expression
    /// evaluates to `true`.
    pub condition: Option<Expression>,
}

/// A stage input block: one variable per input location.
#[derive(Clone, Debug, PartialEq)]
pub struct InputDeclaration {
    pub stage: ShaderStage,
    pub variables: Vec<InOutVariable>,
}

/// A stage output block.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputDeclaration {
    pub stage: ShaderStage,
    pub variables: Vec<InOutVariable>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InOutVariable {
    pub name: String,
    pub ty: Type,
    /// Must reduce to an integral constant for reflection.
    pub location: Expression,
    pub condition: Option<Expression>,
}

/// Memory layout rule of an external buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemoryLayout {
    #[default]
    Std140,
    Std430,
}

/// A block of descriptor-bound resources.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ExternalDeclaration {
    pub variables: Vec<ExternalVariable>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExternalVariable {
    pub name: String,
    pub ty: Type,
    /// Descriptor set index; must reduce to an integral constant for
    /// reflection.
    pub set_index: Expression,
    /// Binding index within the set; same constraint as `set_index`.
    pub binding_index: Expression,
    pub layout: MemoryLayout,
    pub condition: Option<Expression>,
}

/// Compile-time options of the module.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionDeclaration {
    pub variables: Vec<OptionVariable>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionVariable {
    pub name: String,
    pub ty: Type,
    pub value: Option<Expression>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub return_type: Type,
    pub arguments: Vec<FunctionArgument>,
    pub sequence: SequenceStatement,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionArgument {
    pub name: String,
    pub ty: Type,
}

/// The entry function of a pipeline stage.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryFunctionDeclaration {
    pub stage: ShaderStage,
    pub function: FunctionDeclaration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expression,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStatement {
    pub expression: Option<Expression>,
}

/// An ordered list of statements; also the root of a module.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SequenceStatement {
    pub statements: Vec<Statement>,
}

/// A statement that only exists when an option condition holds.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionalStatement {
    pub condition: Expression,
    pub statement: Box<Statement>,
}

/// An include directive, resolved before reflection.
#[derive(Clone, Debug, PartialEq)]
pub struct IncludeStatement {
    pub libraries: Vec<String>,
}

#[cfg(test)]
mod tests {
    use crate::ast::{
        Expression, FunctionDeclaration, PrimitiveType, ReturnStatement, SequenceStatement,
        Statement, Type,
    };

    // Children are owned, so a clone is a deep copy and cloning twice
    // is structurally identical to cloning once.
    #[test]
    fn clone_round_trip() {
        let function = Statement::FunctionDeclaration(FunctionDeclaration {
            name: "helper".to_owned(),
            return_type: Type::Primitive(PrimitiveType::Float),
            arguments: Vec::new(),
            sequence: SequenceStatement {
                statements: vec![Statement::Return(ReturnStatement {
                    expression: Some(Expression::constant(1.0_f32)),
                })],
            },
        });

        let once = function.clone();
        let twice = once.clone();
        assert_eq!(once, twice);
        assert_eq!(function, twice);
    }
}
