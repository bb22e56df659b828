use pretty_assertions::assert_eq;

use super::assert_migrates;

#[test]
fn single_local_is_handed_over_as_the_enter_result() {
    assert_migrates(
        r#"import net.bytebuddy.asm.Advice;

public class SingleLocalAdvice {

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static void enter(@Advice.Local("fooName") String fooLocal) {
        fooLocal = "Hello World";
    }

    @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
    public static void overrideReturn(@Advice.Return(readOnly = false) String returnVal,
                                      @Advice.Local("fooName") String fooLocal) {

        returnVal = fooLocal;
    }

}
"#,
        r#"import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.AssignReturned;

public class SingleLocalAdvice {
    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static String enter() {
        return "Hello World";
    }

    @AssignReturned.ToReturned
    @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
    public static String overrideReturn(@Advice.Enter String fooLocal) {
        return fooLocal;
    }
}
"#,
    );
}

#[test]
fn local_and_enter_value_share_a_container() {
    assert_migrates(
        r#"import net.bytebuddy.asm.Advice;

public class EnterAndLocalsCombined {

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static int enter(@Advice.Local("fooName") String fooLocal) {
        fooLocal = "Hello World";
        return 42;
    }

    @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
    public static void overrideReturn(@Advice.Return(readOnly = false) String returnVal,
                                      @Advice.Local("fooName") String fooLocal,
                                      @Advice.Enter int enter) {

        returnVal = fooLocal + enter;
    }

}
"#,
        r#"import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.AssignReturned;

public class EnterAndLocalsCombined {
    public static class AdviceLocals {
        public int enter;
        public String fooLocal;
    }

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static AdviceLocals enter() {
        AdviceLocals locals = new AdviceLocals();
        locals.fooLocal = "Hello World";
        locals.enter = 42;
        return locals;
    }

    @AssignReturned.ToReturned
    @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
    public static String overrideReturn(@Advice.Enter AdviceLocals locals) {
        return locals.fooLocal + locals.enter;
    }
}
"#,
    );
}

#[test]
fn enter_value_is_unpacked_when_enter_also_writes() {
    assert_migrates(
        r#"import net.bytebuddy.asm.Advice;

public class EnterAndAssignmentsCombined {

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static int enter(@Advice.FieldValue(readOnly = false, value = "foo") String fooField) {
        fooField = "Hello World";
        return 42;
    }

    @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
    public static void overrideReturn(@Advice.Return(readOnly = false) String returnVal,
                                      @Advice.Enter int enter) {

        returnVal = "Hello " + enter;
    }

}
"#,
        r#"import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.AssignReturned;
import net.bytebuddy.asm.Advice.AssignReturned.ToFields.ToField;

public class EnterAndAssignmentsCombined {
    @AssignReturned.ToFields({@ToField(value = "foo", index = 1)})
    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static Object[] enter() {
        return new Object[]{42, "Hello World"};
    }

    @AssignReturned.ToReturned
    @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
    public static String overrideReturn(@Advice.Enter Object[] enterResult) {
        int enter = (int) enterResult[0];
        return "Hello " + enter;
    }
}
"#,
    );
}

#[test]
fn locals_fields_and_arguments_together() {
    assert_migrates(
        r#"import net.bytebuddy.asm.Advice;

public class ComplexEnter {

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static void enter(@Advice.Argument(value = 42, readOnly = false) String arg1,
                             @Advice.Argument(value = 7, readOnly = false) int arg2,
                             @Advice.FieldValue(value = "myField", readOnly = false) Class<?> classField,
                             @Advice.FieldValue(value = "myOtherField", readOnly = false) String stringField,
                             @Advice.Local("fooName") String fooLocal,
                             @Advice.Local("barName") Number barLocal) {

        Object test = new Object();

        barLocal = 42;
        fooLocal = "Number is " + barLocal;

        arg1 = arg2 + "foobar";
        arg2 = 7;
        stringField = "Hello World";
        classField = String.class;
    }

    @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
    public static void overrideReturn(@Advice.Return(readOnly = false) String instrumentedReturn,
                                      @Advice.FieldValue(value = "myField", readOnly = false) Class<?> classField,
                                      @Advice.FieldValue(value = "myOtherField", readOnly = false) String stringField,
                                      @Advice.Local("fooName") String fooLocal,
                                      @Advice.Local("barName") Number barLocal) {

        stringField = "Hello World" + fooLocal + barLocal;
        //Some multiline
        //clarification comments
        instrumentedReturn = "foobar";
        //another clarification
        classField = String.class;
    }

}
"#,
        r#"import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.AssignReturned;
import net.bytebuddy.asm.Advice.AssignReturned.ToFields.ToField;
import net.bytebuddy.asm.Advice.AssignReturned.ToArguments.ToArgument;

public class ComplexEnter {
    public static class AdviceLocals {
        public String fooLocal;
        public Number barLocal;
    }

    @AssignReturned.ToFields({@ToField(value = "myField", index = 1), @ToField(value = "myOtherField", index = 2)})
    @AssignReturned.ToArguments({@ToArgument(value = 42, index = 3), @ToArgument(value = 7, index = 4)})
    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static Object[] enter(@Advice.Argument(7) int arg2) {
        AdviceLocals locals = new AdviceLocals();
        Object test = new Object();
        locals.barLocal = 42;
        locals.fooLocal = "Number is " + locals.barLocal;
        return new Object[]{locals, String.class, "Hello World", arg2 + "foobar", 7};
    }

    @AssignReturned.ToReturned(index = 0)
    @AssignReturned.ToFields({@ToField(value = "myField", index = 1), @ToField(value = "myOtherField", index = 2)})
    @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
    public static Object[] overrideReturn(@Advice.Enter Object[] enterResult) {
        AdviceLocals locals = (AdviceLocals) enterResult[0];
        //Some multiline
        //clarification comments
        //another clarification
        return new Object[]{"foobar", String.class, "Hello World" + locals.fooLocal + locals.barLocal};
    }
}
"#,
    );
}

#[test]
fn enter_annotation_follows_the_exit_marker_spelling() {
    let migrated = assert_migrates(
        r#"import net.bytebuddy.asm.Advice.Local;
import net.bytebuddy.asm.Advice.OnMethodEnter;
import net.bytebuddy.asm.Advice.OnMethodExit;

public class TimingAdvice {
    @OnMethodEnter
    public static void start(@Local("start") long start) {
        start = System.nanoTime();
    }

    @OnMethodExit
    public static void stop(@Local("start") long start) {
        Timer.record(System.nanoTime() - start);
    }
}
"#,
        r#"import net.bytebuddy.asm.Advice.Local;
import net.bytebuddy.asm.Advice.OnMethodEnter;
import net.bytebuddy.asm.Advice.OnMethodExit;
import net.bytebuddy.asm.Advice.Enter;

public class TimingAdvice {
    @OnMethodEnter
    public static long start() {
        return System.nanoTime();
    }

    @OnMethodExit
    public static void stop(@Enter long start) {
        Timer.record(System.nanoTime() - start);
    }
}
"#,
    );
    assert_eq!(
        migrated.report.imports_added,
        vec!["net.bytebuddy.asm.Advice.Enter"]
    );
}

#[test]
fn generated_names_avoid_names_already_in_use() {
    assert_migrates(
        r#"import net.bytebuddy.asm.Advice;

public class ClashingNamesAdvice {

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static void enter(@Advice.Local("a") String a, @Advice.Local("b") String b) {
        String locals = "x";
        a = locals;
        b = locals + "y";
    }

    @Advice.OnMethodExit(suppress = Throwable.class)
    public static void exit(@Advice.Local("a") String a, @Advice.Local("b") String b) {
        int locals = 1;
        System.out.println(a + b + locals);
    }
}
"#,
        r#"import net.bytebuddy.asm.Advice;

public class ClashingNamesAdvice {
    public static class AdviceLocals {
        public String a;
        public String b;
    }

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static AdviceLocals enter() {
        AdviceLocals locals2 = new AdviceLocals();
        String locals = "x";
        locals2.a = locals;
        locals2.b = locals + "y";
        return locals2;
    }

    @Advice.OnMethodExit(suppress = Throwable.class)
    public static void exit(@Advice.Enter AdviceLocals locals2) {
        int locals = 1;
        System.out.println(locals2.a + locals2.b + locals);
    }
}
"#,
    );
}
