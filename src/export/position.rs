/// The export phases, in the order the assembler visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExportPosition {
    Models,
    Skills,
    Agents,
    Chats,
}

impl ExportPosition {
    pub const ALL: [ExportPosition; 4] = [
        ExportPosition::Models,
        ExportPosition::Skills,
        ExportPosition::Agents,
        ExportPosition::Chats,
    ];
}

/// The import block a statement goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportPosition {
    Builtin,
    ThirdParty,
    /// Modules written next to the program, such as the API-key file.
    Local,
}

/// Where a content fragment is inserted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placement {
    Before(ExportPosition),
    After(ExportPosition),
    /// Right before the block of the agent with this id.
    BeforeAgent(String),
    /// Right after the block of the agent with this id.
    AfterAgent(String),
}
