//! Parser for the generic `Signature` attribute grammar (JVMS 4.7.9.1).
//!
//! Type parameter lists are parsed in two passes. The identifiers are
//! scanned first so that every bound can mention any variable of its own
//! list; those mentions become [`Type::TypeVariableReference`]s and are
//! linked up by [`TypeParametersBuilder::finish`].

use std::sync::Arc;

use classdex_classfile::{BaseType, ErrorKind};
use classdex_core::NameTable;
use smol_str::SmolStr;
use thiserror::Error;

use crate::params::{TypeParametersBuilder, TypeVarScope};
use crate::ty::{Type, TypeVariable, TypeVariableReference, TypeVariableSlot, WildcardBound};

/// Nesting limit for type arguments and arrays.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid signature `{signature}` at byte {position}: {message}")]
pub struct SignatureError {
    pub signature: String,
    pub position: usize,
    pub message: &'static str,
}

impl SignatureError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}

pub type Result<T> = std::result::Result<T, SignatureError>;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassSignature {
    pub type_parameters: Vec<Arc<TypeVariable>>,
    pub superclass: Type,
    pub interfaces: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    pub type_parameters: Vec<Arc<TypeVariable>>,
    pub parameters: Vec<Type>,
    pub return_type: Type,
    pub exceptions: Vec<Type>,
}

/// Parses a class signature such as `<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/lang/Comparable<TT;>;`.
///
/// `annotate` sees the type parameters after their bounds are parsed and
/// before they are frozen, so annotations on parameters and bounds are
/// visible through every occurrence of the variable.
pub fn parse_class_signature(
    signature: &str,
    names: &mut NameTable,
    scope: &TypeVarScope,
    annotate: impl FnOnce(&mut TypeParametersBuilder),
) -> Result<ClassSignature> {
    let mut parser = Parser::new(signature, names, scope);
    let type_parameters = parser.type_parameters(annotate)?;
    parser.scope.push(type_parameters.clone());

    let superclass = parser.class_type()?;
    let mut interfaces = Vec::new();
    while !parser.at_end() {
        interfaces.push(parser.class_type()?);
    }
    Ok(ClassSignature {
        type_parameters,
        superclass,
        interfaces,
    })
}

/// Parses a method signature such as `<T:Ljava/lang/Object;>(TT;I)[TT;^Ljava/io/IOException;`.
pub fn parse_method_signature(
    signature: &str,
    names: &mut NameTable,
    scope: &TypeVarScope,
    annotate: impl FnOnce(&mut TypeParametersBuilder),
) -> Result<MethodSignature> {
    let mut parser = Parser::new(signature, names, scope);
    let type_parameters = parser.type_parameters(annotate)?;
    parser.scope.push(type_parameters.clone());

    parser.expect(b'(', "expected `(`")?;
    let mut parameters = Vec::new();
    while parser.peek() != Some(b')') {
        parameters.push(parser.java_type()?);
    }
    parser.bump();

    let return_type = if parser.eat(b'V') {
        Type::Void
    } else {
        parser.java_type()?
    };

    let mut exceptions = Vec::new();
    while parser.eat(b'^') {
        exceptions.push(parser.reference_type()?);
    }
    parser.finish()?;

    Ok(MethodSignature {
        type_parameters,
        parameters,
        return_type,
        exceptions,
    })
}

/// Parses the signature of a field or record component.
pub fn parse_field_signature(signature: &str, names: &mut NameTable, scope: &TypeVarScope) -> Result<Type> {
    let mut parser = Parser::new(signature, names, scope);
    let ty = parser.java_type()?;
    parser.finish()?;
    Ok(ty)
}

struct Parser<'a> {
    signature: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    names: &'a mut NameTable,
    scope: TypeVarScope,
    /// Slots of the type parameter list currently being parsed.
    pending: Vec<Arc<TypeVariableSlot>>,
}

impl<'a> Parser<'a> {
    fn new(signature: &'a str, names: &'a mut NameTable, scope: &TypeVarScope) -> Self {
        Self {
            signature,
            bytes: signature.as_bytes(),
            pos: 0,
            depth: 0,
            names,
            scope: scope.clone(),
            pending: Vec::new(),
        }
    }

    fn error(&self, message: &'static str) -> SignatureError {
        SignatureError {
            signature: self.signature.to_string(),
            position: self.pos,
            message,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8, message: &'static str) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("trailing characters"))
        }
    }

    fn type_parameters(
        &mut self,
        annotate: impl FnOnce(&mut TypeParametersBuilder),
    ) -> Result<Vec<Arc<TypeVariable>>> {
        if self.peek() != Some(b'<') {
            let mut empty = TypeParametersBuilder::new(Vec::<SmolStr>::new());
            annotate(&mut empty);
            return Ok(Vec::new());
        }

        let identifiers = scan_type_parameters(self.bytes, self.pos)
            .ok_or_else(|| self.error("malformed type parameters"))?;
        let mut builder = TypeParametersBuilder::new(identifiers);
        self.pending = builder.slots().to_vec();

        self.bump();
        for position in 0..builder.len() {
            self.identifier(b':')?;
            self.expect(b':', "expected `:` after type parameter")?;

            let mut bounds = Vec::new();
            let class_bound = matches!(self.peek(), Some(b'L' | b'T' | b'['));
            if class_bound {
                bounds.push(self.reference_type()?);
            }
            while self.eat(b':') {
                bounds.push(self.reference_type()?);
            }
            let implicit_object_bound = !class_bound && !bounds.is_empty();
            builder.set_bounds(position, bounds, implicit_object_bound);
        }
        self.expect(b'>', "expected `>` after type parameters")?;
        self.pending.clear();

        annotate(&mut builder);
        Ok(builder.finish())
    }

    /// Reads an identifier up to (not including) one of the grammar's
    /// delimiters.
    fn identifier(&mut self, terminator: u8) -> Result<&'a str> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == terminator || matches!(byte, b'.' | b';' | b'[' | b'/' | b'<' | b'>' | b':') {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        let signature = self.signature;
        Ok(&signature[start..self.pos])
    }

    fn java_type(&mut self) -> Result<Type> {
        match self.peek() {
            Some(byte) => match BaseType::from_descriptor(byte) {
                Some(base) => {
                    self.bump();
                    Ok(Type::primitive(base))
                }
                None => self.reference_type(),
            },
            None => Err(self.error("unexpected end of signature")),
        }
    }

    fn reference_type(&mut self) -> Result<Type> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("signature nested too deeply"));
        }
        let result = match self.peek() {
            Some(b'L') => self.class_type(),
            Some(b'T') => self.type_variable(),
            Some(b'[') => {
                self.bump();
                self.java_type().map(|component| Type::array(component, 1))
            }
            Some(_) => Err(self.error("expected reference type")),
            None => Err(self.error("unexpected end of signature")),
        };
        self.depth -= 1;
        result
    }

    fn type_variable(&mut self) -> Result<Type> {
        self.expect(b'T', "expected `T`")?;
        let identifier = self.identifier(b';')?;
        self.expect(b';', "expected `;` after type variable")?;
        Ok(self.resolve(identifier))
    }

    fn resolve(&self, identifier: &str) -> Type {
        if let Some(slot) = self.pending.iter().find(|slot| slot.identifier() == identifier) {
            return Type::TypeVariableReference(TypeVariableReference::new(slot.clone(), Vec::new()));
        }
        match self.scope.lookup(identifier) {
            Some(variable) => Type::TypeVariable(variable.clone()),
            None => Type::unresolved(identifier),
        }
    }

    fn class_type(&mut self) -> Result<Type> {
        self.expect(b'L', "expected class type")?;

        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b'<' | b'.' | b';') {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected class name"));
        }
        let mut internal = self.signature[start..self.pos].to_string();

        let mut current: Option<Type> = None;
        loop {
            let arguments = self.type_arguments()?;
            let owner = match current.take() {
                Some(owner @ Type::Parameterized(_)) => Some(owner),
                _ => None,
            };
            let name = self.names.from_internal(&internal);
            current = Some(if arguments.is_empty() && owner.is_none() {
                Type::class(name)
            } else {
                Type::parameterized(name, arguments, owner)
            });

            if self.eat(b'.') {
                let simple = self.identifier(b';')?;
                internal.push('$');
                internal.push_str(simple);
                continue;
            }
            self.expect(b';', "expected `;` after class type")?;
            break;
        }
        current.ok_or_else(|| self.error("expected class type"))
    }

    fn type_arguments(&mut self) -> Result<Vec<Type>> {
        if !self.eat(b'<') {
            return Ok(Vec::new());
        }
        let mut arguments = Vec::new();
        while !self.eat(b'>') {
            let argument = match self.peek() {
                Some(b'*') => {
                    self.bump();
                    Type::wildcard(WildcardBound::Unbounded)
                }
                Some(b'+') => {
                    self.bump();
                    Type::wildcard(WildcardBound::Extends(Box::new(self.reference_type()?)))
                }
                Some(b'-') => {
                    self.bump();
                    Type::wildcard(WildcardBound::Super(Box::new(self.reference_type()?)))
                }
                _ => self.reference_type()?,
            };
            arguments.push(argument);
        }
        if arguments.is_empty() {
            return Err(self.error("empty type argument list"));
        }
        Ok(arguments)
    }
}

/// Collects the identifiers of the type parameter list starting at `start`
/// without building any bound.
fn scan_type_parameters(bytes: &[u8], start: usize) -> Option<Vec<SmolStr>> {
    let mut pos = start;
    if bytes.get(pos) != Some(&b'<') {
        return None;
    }
    pos += 1;

    let mut identifiers = Vec::new();
    loop {
        match bytes.get(pos)? {
            b'>' if !identifiers.is_empty() => return Some(identifiers),
            _ => {}
        }
        let begin = pos;
        while *bytes.get(pos)? != b':' {
            pos += 1;
        }
        if pos == begin {
            return None;
        }
        identifiers.push(SmolStr::new(std::str::from_utf8(&bytes[begin..pos]).ok()?));

        pos += 1;
        if matches!(bytes.get(pos), Some(b'L' | b'T' | b'[')) {
            pos = skip_reference(bytes, pos)?;
        }
        while bytes.get(pos) == Some(&b':') {
            pos = skip_reference(bytes, pos + 1)?;
        }
    }
}

/// Index just past the reference type signature starting at `pos`.
fn skip_reference(bytes: &[u8], pos: usize) -> Option<usize> {
    match bytes.get(pos)? {
        b'L' => {
            let mut depth = 0usize;
            let mut i = pos + 1;
            loop {
                match bytes.get(i)? {
                    b'<' => depth += 1,
                    b'>' => depth = depth.checked_sub(1)?,
                    b';' if depth == 0 => return Some(i + 1),
                    _ => {}
                }
                i += 1;
            }
        }
        b'T' => {
            let end = bytes[pos..].iter().position(|&b| b == b';')?;
            Some(pos + end + 1)
        }
        b'[' => {
            let mut i = pos;
            while bytes.get(i) == Some(&b'[') {
                i += 1;
            }
            if BaseType::from_descriptor(*bytes.get(i)?).is_some() {
                Some(i + 1)
            } else {
                skip_reference(bytes, i)
            }
        }
        _ => None,
    }
}
